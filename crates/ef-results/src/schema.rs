//! Serde schema of the persisted parameter trees and graphs.
//!
//! The on-disk representation is decoupled from the runtime types: this
//! module defines plain data records with stable field names and the
//! conversions to and from the model layer. Unknown fields are rejected
//! so structural drift surfaces as a typed error instead of silently
//! dropping data.

use ef_core::{AgeGroup, Real};
use ef_graph::{Graph, MigrationParameters, ModelNode};
use ef_model::{Parameters, Populations, SecihurdModel, COMPARTMENTS, NUM_COMPARTMENTS};
use ef_params::{
    ContactMatrix, ContactMatrixGroup, NormalDistribution, ParameterDistribution, UncertainValue,
    UniformDistribution,
};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, tag = "Type")]
pub enum DistributionRecord {
    Normal {
        #[serde(rename = "Mean")]
        mean: Real,
        #[serde(rename = "StandardDev")]
        standard_dev: Real,
        #[serde(rename = "Min")]
        min: Real,
        #[serde(rename = "Max")]
        max: Real,
        #[serde(rename = "PredefinedSamples", default, skip_serializing_if = "Vec::is_empty")]
        predefined_samples: Vec<Real>,
    },
    Uniform {
        #[serde(rename = "Min")]
        min: Real,
        #[serde(rename = "Max")]
        max: Real,
        #[serde(rename = "PredefinedSamples", default, skip_serializing_if = "Vec::is_empty")]
        predefined_samples: Vec<Real>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueRecord {
    #[serde(rename = "Value")]
    pub value: Real,
    #[serde(rename = "Distribution", default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DampingRecord {
    #[serde(rename = "Time")]
    pub time: Real,
    #[serde(rename = "Matrix")]
    pub matrix: Vec<Vec<Real>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactRecord {
    #[serde(rename = "Baseline")]
    pub baseline: Vec<Vec<Real>>,
    #[serde(rename = "Dampings", default, skip_serializing_if = "Vec::is_empty")]
    pub dampings: Vec<DampingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametersRecord {
    #[serde(rename = "IncubationTime")]
    pub incubation_time: Vec<ValueRecord>,
    #[serde(rename = "InfectiousTimeMild")]
    pub infectious_time_mild: Vec<ValueRecord>,
    #[serde(rename = "InfectiousTimeAsymptomatic")]
    pub infectious_time_asymptomatic: Vec<ValueRecord>,
    #[serde(rename = "SerialInterval")]
    pub serial_interval: Vec<ValueRecord>,
    #[serde(rename = "HospitalizedToHomeTime")]
    pub hospitalized_to_home_time: Vec<ValueRecord>,
    #[serde(rename = "HomeToHospitalizedTime")]
    pub home_to_hospitalized_time: Vec<ValueRecord>,
    #[serde(rename = "HospitalizedToICUTime")]
    pub hospitalized_to_icu_time: Vec<ValueRecord>,
    #[serde(rename = "ICUToHomeTime")]
    pub icu_to_home_time: Vec<ValueRecord>,
    #[serde(rename = "ICUToDeathTime")]
    pub icu_to_death_time: Vec<ValueRecord>,
    #[serde(rename = "InfectionProbabilityFromContact")]
    pub infection_probability_from_contact: Vec<ValueRecord>,
    #[serde(rename = "RelativeCarrierInfectability")]
    pub relative_carrier_infectability: Vec<ValueRecord>,
    #[serde(rename = "AsymptomaticCasesPerInfectious")]
    pub asymptomatic_cases_per_infectious: Vec<ValueRecord>,
    #[serde(rename = "RiskOfInfectionFromSymptomatic")]
    pub risk_of_infection_from_symptomatic: Vec<ValueRecord>,
    #[serde(rename = "MaxRiskOfInfectionFromSymptomatic")]
    pub max_risk_of_infection_from_symptomatic: Vec<ValueRecord>,
    #[serde(rename = "HospitalizedCasesPerInfectious")]
    pub hospitalized_cases_per_infectious: Vec<ValueRecord>,
    #[serde(rename = "ICUCasesPerHospitalized")]
    pub icu_cases_per_hospitalized: Vec<ValueRecord>,
    #[serde(rename = "DeathsPerHospitalized")]
    pub deaths_per_hospitalized: Vec<ValueRecord>,
    #[serde(rename = "ICUCapacity")]
    pub icu_capacity: ValueRecord,
    #[serde(rename = "TestAndTraceCapacity")]
    pub test_and_trace_capacity: ValueRecord,
    #[serde(rename = "Seasonality")]
    pub seasonality: ValueRecord,
    #[serde(rename = "StartDay")]
    pub start_day: Real,
    #[serde(rename = "ContactPatterns")]
    pub contact_patterns: Vec<ContactRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRecord {
    #[serde(rename = "Parameters")]
    pub parameters: ParametersRecord,
    /// One row per age group, one column per compartment.
    #[serde(rename = "Populations")]
    pub populations: Vec<Vec<ValueRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRecord {
    #[serde(rename = "NodeId")]
    pub node_id: u32,
    #[serde(rename = "StayDuration")]
    pub stay_duration: Real,
    #[serde(rename = "Model")]
    pub model: ModelRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeRecord {
    #[serde(rename = "StartNodeIndex")]
    pub start_node_index: usize,
    #[serde(rename = "EndNodeIndex")]
    pub end_node_index: usize,
    #[serde(rename = "Coefficients")]
    pub coefficients: Vec<Real>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphRecord {
    #[serde(rename = "Nodes")]
    pub nodes: Vec<NodeRecord>,
    #[serde(rename = "Edges")]
    pub edges: Vec<EdgeRecord>,
}

fn distribution_to_record(distribution: &ParameterDistribution) -> DistributionRecord {
    match distribution {
        ParameterDistribution::Normal(d) => DistributionRecord::Normal {
            mean: d.mean,
            standard_dev: d.std_dev,
            min: d.lower,
            max: d.upper,
            predefined_samples: distribution.predefined_samples().collect(),
        },
        ParameterDistribution::Uniform(d) => DistributionRecord::Uniform {
            min: d.lower,
            max: d.upper,
            predefined_samples: distribution.predefined_samples().collect(),
        },
    }
}

fn distribution_from_record(record: &DistributionRecord) -> ResultsResult<ParameterDistribution> {
    let (mut distribution, samples) = match record {
        DistributionRecord::Normal {
            mean,
            standard_dev,
            min,
            max,
            predefined_samples,
        } => {
            let normal = NormalDistribution::new(*mean, *standard_dev, *min, *max).map_err(|e| {
                ResultsError::OutOfRange {
                    what: e.to_string(),
                }
            })?;
            (ParameterDistribution::Normal(normal), predefined_samples)
        }
        DistributionRecord::Uniform {
            min,
            max,
            predefined_samples,
        } => {
            let uniform = UniformDistribution::new(*min, *max).map_err(|e| {
                ResultsError::OutOfRange {
                    what: e.to_string(),
                }
            })?;
            (ParameterDistribution::Uniform(uniform), predefined_samples)
        }
    };
    for &sample in samples {
        distribution.add_predefined_sample(sample);
    }
    Ok(distribution)
}

fn value_to_record(value: &UncertainValue) -> ValueRecord {
    ValueRecord {
        value: value.value(),
        distribution: value.distribution().map(distribution_to_record),
    }
}

fn value_from_record(record: &ValueRecord) -> ResultsResult<UncertainValue> {
    if !record.value.is_finite() {
        return Err(ResultsError::OutOfRange {
            what: format!("non-finite value {}", record.value),
        });
    }
    let mut value = UncertainValue::new(record.value);
    if let Some(distribution) = &record.distribution {
        value.set_distribution(distribution_from_record(distribution)?);
    }
    Ok(value)
}

fn matrix_to_rows(matrix: &DMatrix<Real>) -> Vec<Vec<Real>> {
    (0..matrix.nrows())
        .map(|r| (0..matrix.ncols()).map(|c| matrix[(r, c)]).collect())
        .collect()
}

fn matrix_from_rows(rows: &[Vec<Real>], what: &str) -> ResultsResult<DMatrix<Real>> {
    let nrows = rows.len();
    if nrows == 0 {
        return Err(ResultsError::InvalidData {
            what: format!("{what}: empty matrix"),
        });
    }
    let ncols = rows[0].len();
    if rows.iter().any(|row| row.len() != ncols) {
        return Err(ResultsError::InvalidData {
            what: format!("{what}: ragged matrix rows"),
        });
    }
    Ok(DMatrix::from_fn(nrows, ncols, |r, c| rows[r][c]))
}

impl ParametersRecord {
    pub fn from_parameters(parameters: &Parameters) -> Self {
        let series =
            |param: &ef_model::AgeParam| param.iter().map(value_to_record).collect::<Vec<_>>();
        Self {
            incubation_time: series(&parameters.incubation_time),
            infectious_time_mild: series(&parameters.infectious_time_mild),
            infectious_time_asymptomatic: series(&parameters.infectious_time_asymptomatic),
            serial_interval: series(&parameters.serial_interval),
            hospitalized_to_home_time: series(&parameters.hospitalized_to_home_time),
            home_to_hospitalized_time: series(&parameters.home_to_hospitalized_time),
            hospitalized_to_icu_time: series(&parameters.hospitalized_to_icu_time),
            icu_to_home_time: series(&parameters.icu_to_home_time),
            icu_to_death_time: series(&parameters.icu_to_death_time),
            infection_probability_from_contact: series(
                &parameters.infection_probability_from_contact,
            ),
            relative_carrier_infectability: series(&parameters.relative_carrier_infectability),
            asymptomatic_cases_per_infectious: series(
                &parameters.asymptomatic_cases_per_infectious,
            ),
            risk_of_infection_from_symptomatic: series(
                &parameters.risk_of_infection_from_symptomatic,
            ),
            max_risk_of_infection_from_symptomatic: series(
                &parameters.max_risk_of_infection_from_symptomatic,
            ),
            hospitalized_cases_per_infectious: series(
                &parameters.hospitalized_cases_per_infectious,
            ),
            icu_cases_per_hospitalized: series(&parameters.icu_cases_per_hospitalized),
            deaths_per_hospitalized: series(&parameters.deaths_per_hospitalized),
            icu_capacity: value_to_record(&parameters.icu_capacity),
            test_and_trace_capacity: value_to_record(&parameters.test_and_trace_capacity),
            seasonality: value_to_record(&parameters.seasonality),
            start_day: parameters.start_day,
            contact_patterns: parameters
                .contact_patterns
                .iter()
                .map(|cm| ContactRecord {
                    baseline: matrix_to_rows(cm.baseline()),
                    dampings: cm
                        .dampings()
                        .entries()
                        .iter()
                        .map(|d| DampingRecord {
                            time: d.time,
                            matrix: matrix_to_rows(&d.value),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn to_parameters(&self, num_groups: usize) -> ResultsResult<Parameters> {
        let mut parameters = Parameters::new(num_groups);

        let fill =
            |record: &[ValueRecord], target: &mut ef_model::AgeParam| -> ResultsResult<()> {
                if record.len() != num_groups {
                    return Err(ResultsError::InvalidData {
                        what: format!(
                            "age series has {} entries, expected {num_groups}",
                            record.len()
                        ),
                    });
                }
                for (cell, rec) in target.iter_mut().zip(record) {
                    *cell = value_from_record(rec)?;
                }
                Ok(())
            };

        fill(&self.incubation_time, &mut parameters.incubation_time)?;
        fill(&self.infectious_time_mild, &mut parameters.infectious_time_mild)?;
        fill(
            &self.infectious_time_asymptomatic,
            &mut parameters.infectious_time_asymptomatic,
        )?;
        fill(&self.serial_interval, &mut parameters.serial_interval)?;
        fill(
            &self.hospitalized_to_home_time,
            &mut parameters.hospitalized_to_home_time,
        )?;
        fill(
            &self.home_to_hospitalized_time,
            &mut parameters.home_to_hospitalized_time,
        )?;
        fill(
            &self.hospitalized_to_icu_time,
            &mut parameters.hospitalized_to_icu_time,
        )?;
        fill(&self.icu_to_home_time, &mut parameters.icu_to_home_time)?;
        fill(&self.icu_to_death_time, &mut parameters.icu_to_death_time)?;
        fill(
            &self.infection_probability_from_contact,
            &mut parameters.infection_probability_from_contact,
        )?;
        fill(
            &self.relative_carrier_infectability,
            &mut parameters.relative_carrier_infectability,
        )?;
        fill(
            &self.asymptomatic_cases_per_infectious,
            &mut parameters.asymptomatic_cases_per_infectious,
        )?;
        fill(
            &self.risk_of_infection_from_symptomatic,
            &mut parameters.risk_of_infection_from_symptomatic,
        )?;
        fill(
            &self.max_risk_of_infection_from_symptomatic,
            &mut parameters.max_risk_of_infection_from_symptomatic,
        )?;
        fill(
            &self.hospitalized_cases_per_infectious,
            &mut parameters.hospitalized_cases_per_infectious,
        )?;
        fill(
            &self.icu_cases_per_hospitalized,
            &mut parameters.icu_cases_per_hospitalized,
        )?;
        fill(
            &self.deaths_per_hospitalized,
            &mut parameters.deaths_per_hospitalized,
        )?;

        parameters.icu_capacity = value_from_record(&self.icu_capacity)?;
        parameters.test_and_trace_capacity = value_from_record(&self.test_and_trace_capacity)?;
        parameters.seasonality = value_from_record(&self.seasonality)?;
        if !self.start_day.is_finite() || self.start_day < 0.0 {
            return Err(ResultsError::OutOfRange {
                what: format!("StartDay must be a non-negative day, got {}", self.start_day),
            });
        }
        parameters.start_day = self.start_day;

        if self.contact_patterns.is_empty() {
            return Err(ResultsError::InvalidData {
                what: "at least one contact setting is required".to_string(),
            });
        }
        let mut group = ContactMatrixGroup::new(self.contact_patterns.len(), num_groups);
        for (setting, record) in self.contact_patterns.iter().enumerate() {
            let baseline = matrix_from_rows(&record.baseline, "contact baseline")?;
            if baseline.nrows() != num_groups {
                return Err(ResultsError::InvalidData {
                    what: format!(
                        "contact baseline is {}x{}, expected {num_groups}x{num_groups}",
                        baseline.nrows(),
                        baseline.ncols()
                    ),
                });
            }
            let mut matrix = ContactMatrix::new(baseline);
            for damping in &record.dampings {
                matrix.add_damping(matrix_from_rows(&damping.matrix, "damping")?, damping.time);
            }
            group[setting] = matrix;
        }
        parameters.contact_patterns = group;

        Ok(parameters)
    }
}

impl ModelRecord {
    pub fn from_model(model: &SecihurdModel) -> Self {
        let num_groups = model.num_groups();
        let populations = AgeGroup::range(num_groups)
            .map(|age| {
                COMPARTMENTS
                    .iter()
                    .map(|&c| value_to_record(model.populations.cell(age, c)))
                    .collect()
            })
            .collect();
        Self {
            parameters: ParametersRecord::from_parameters(&model.parameters),
            populations,
        }
    }

    pub fn to_model(&self) -> ResultsResult<SecihurdModel> {
        let num_groups = self.populations.len();
        if num_groups == 0 {
            return Err(ResultsError::InvalidData {
                what: "model needs at least one age group".to_string(),
            });
        }
        let parameters = self.parameters.to_parameters(num_groups)?;
        let mut populations = Populations::new(num_groups);
        for (age, row) in self.populations.iter().enumerate() {
            if row.len() != NUM_COMPARTMENTS {
                return Err(ResultsError::InvalidData {
                    what: format!(
                        "population row has {} compartments, expected {NUM_COMPARTMENTS}",
                        row.len()
                    ),
                });
            }
            for (compartment, record) in COMPARTMENTS.iter().zip(row) {
                if record.value < 0.0 {
                    return Err(ResultsError::OutOfRange {
                        what: format!("negative population cell {}", record.value),
                    });
                }
                *populations.cell_mut(AgeGroup(age), *compartment) = value_from_record(record)?;
            }
        }
        Ok(SecihurdModel {
            parameters,
            populations,
        })
    }
}

impl GraphRecord {
    pub fn from_graph(graph: &Graph<ModelNode, MigrationParameters>) -> Self {
        Self {
            nodes: graph
                .nodes()
                .iter()
                .map(|node| NodeRecord {
                    node_id: node.region_id,
                    stay_duration: node.stay_duration,
                    model: ModelRecord::from_model(&node.model),
                })
                .collect(),
            edges: graph
                .edges()
                .iter()
                .map(|edge| EdgeRecord {
                    start_node_index: edge.start_node_idx,
                    end_node_index: edge.end_node_idx,
                    coefficients: edge.property.coefficients.iter().copied().collect(),
                })
                .collect(),
        }
    }

    pub fn to_graph(&self) -> ResultsResult<Graph<ModelNode, MigrationParameters>> {
        let mut graph = Graph::new();
        for node in &self.nodes {
            if !(node.stay_duration >= 0.0) {
                return Err(ResultsError::OutOfRange {
                    what: format!("StayDuration must be non-negative, got {}", node.stay_duration),
                });
            }
            graph.add_node(ModelNode {
                region_id: node.node_id,
                model: node.model.to_model()?,
                stay_duration: node.stay_duration,
            });
        }
        for edge in &self.edges {
            let coefficients = DVector::from_vec(edge.coefficients.clone());
            let parameters = MigrationParameters::new(coefficients).map_err(|e| {
                ResultsError::OutOfRange {
                    what: e.to_string(),
                }
            })?;
            graph
                .add_edge(edge.start_node_index, edge.end_node_index, parameters)
                .map_err(|e| ResultsError::InvalidData {
                    what: e.to_string(),
                })?;
        }
        Ok(graph)
    }
}
