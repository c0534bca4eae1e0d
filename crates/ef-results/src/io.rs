//! Reading and writing parameter trees, graphs and time-series tables.

use std::fs;
use std::path::Path;

use ef_core::TimeSeries;
use ef_graph::{Graph, MigrationParameters, ModelNode};
use ef_model::{SecihurdModel, COMPARTMENTS, NUM_COMPARTMENTS};

use crate::error::{classify_json_error, ResultsError, ResultsResult};
use crate::schema::{GraphRecord, ModelRecord};

fn fs_err(path: &Path) -> impl FnOnce(std::io::Error) -> ResultsError + '_ {
    move |source| ResultsError::FileSystem {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a model's parameter tree and populations as pretty JSON.
pub fn save_model(path: &Path, model: &SecihurdModel) -> ResultsResult<()> {
    let record = ModelRecord::from_model(model);
    let json = serde_json::to_string_pretty(&record).map_err(|source| ResultsError::Malformed {
        source,
    })?;
    fs::write(path, json).map_err(fs_err(path))
}

/// Read a model back; structural mismatches surface as typed errors.
pub fn load_model(path: &Path) -> ResultsResult<SecihurdModel> {
    let content = fs::read_to_string(path).map_err(fs_err(path))?;
    let record: ModelRecord = serde_json::from_str(&content).map_err(classify_json_error)?;
    record.to_model()
}

/// Write a study graph: one record per node (id + model), one per edge.
pub fn save_graph(path: &Path, graph: &Graph<ModelNode, MigrationParameters>) -> ResultsResult<()> {
    let record = GraphRecord::from_graph(graph);
    let json = serde_json::to_string_pretty(&record).map_err(|source| ResultsError::Malformed {
        source,
    })?;
    fs::write(path, json).map_err(fs_err(path))
}

pub fn load_graph(path: &Path) -> ResultsResult<Graph<ModelNode, MigrationParameters>> {
    let content = fs::read_to_string(path).map_err(fs_err(path))?;
    let record: GraphRecord = serde_json::from_str(&content).map_err(classify_json_error)?;
    record.to_graph()
}

/// Write one node's time series as a CSV table: a `Time` column followed
/// by the flattened (age x compartment) values.
pub fn save_timeseries_csv(path: &Path, series: &TimeSeries) -> ResultsResult<()> {
    if series.num_elements() % NUM_COMPARTMENTS != 0 {
        return Err(ResultsError::InvalidData {
            what: format!(
                "series width {} is not a whole number of age groups",
                series.num_elements()
            ),
        });
    }
    let num_groups = series.num_elements() / NUM_COMPARTMENTS;

    let file = fs::File::create(path).map_err(fs_err(path))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["Time".to_string()];
    for age in 0..num_groups {
        for compartment in COMPARTMENTS {
            header.push(format!("Group{}_{}", age + 1, compartment.label()));
        }
    }
    writer
        .write_record(&header)
        .map_err(|source| ResultsError::Csv { source })?;

    for (t, value) in series.iter() {
        let mut row = Vec::with_capacity(value.len() + 1);
        row.push(t.to_string());
        row.extend(value.iter().map(|v| v.to_string()));
        writer
            .write_record(&row)
            .map_err(|source| ResultsError::Csv { source })?;
    }
    writer
        .flush()
        .map_err(|source| ResultsError::FileSystem {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}
