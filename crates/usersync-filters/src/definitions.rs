//! Filter definitions from tabular rows
//!
//! Each row names an owner (the login column) and, for every configured
//! label column, one value the owner may see. Rows of the same owner are
//! merged into a single definition.

use tracing::{debug, info};

use usersync_core::config::{FiltersConfig, LabelColumn};
use usersync_core::domain::{merge_definitions, FilterClause, FilterDefinition};
use usersync_core::ports::IRecordSource;

use crate::error::FilterError;

/// Reads [`FilterDefinition`]s from a record source
pub struct DefinitionLoader {
    login_column: String,
    labels: Vec<LabelColumn>,
}

impl DefinitionLoader {
    pub fn new(login_column: impl Into<String>, labels: Vec<LabelColumn>) -> Self {
        Self {
            login_column: login_column.into(),
            labels,
        }
    }

    pub fn from_config(config: &FiltersConfig) -> Self {
        Self::new(config.login_column.clone(), config.labels.clone())
    }

    /// Reads every row of `source` and merges the definitions per owner
    ///
    /// Rows with a blank login are skipped, as are blank value cells.
    ///
    /// # Errors
    /// [`FilterError::MissingColumn`] when the login column or a label column
    /// is absent, [`FilterError::Source`] when a row cannot be read.
    pub fn load(&self, source: &mut dyn IRecordSource) -> Result<Vec<FilterDefinition>, FilterError> {
        let headers: Vec<String> = source.headers().iter().map(|h| h.trim().to_lowercase()).collect();
        let index_of = |column: &str| {
            let wanted = column.trim().to_lowercase();
            headers
                .iter()
                .position(|h| *h == wanted)
                .ok_or_else(|| FilterError::MissingColumn(column.to_string()))
        };

        let login_index = index_of(&self.login_column)?;
        let label_indexes = self
            .labels
            .iter()
            .map(|label| index_of(&label.column).map(|index| (index, label)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut definitions = Vec::new();
        let mut rows = 0usize;
        while let Some(row) = source.next_row() {
            let row = row.map_err(|e| FilterError::Source(format!("{e:#}")))?;
            rows += 1;

            let login = row.get(login_index).map(|l| l.trim()).unwrap_or_default();
            if login.is_empty() {
                debug!(row = rows, "Skipping filter row without login");
                continue;
            }

            let clauses = label_indexes
                .iter()
                .filter_map(|(index, label)| {
                    let value = row.get(*index).map(|v| v.trim()).filter(|v| !v.is_empty())?;
                    Some(FilterClause {
                        over: label.over.clone(),
                        to: label.to.clone(),
                        ..FilterClause::new(label.label.clone(), vec![value.to_string()])
                    })
                })
                .collect();
            definitions.push(FilterDefinition::new(login, clauses));
        }

        let merged = merge_definitions(&definitions);
        info!(rows, owners = merged.len(), "Filter definitions loaded");
        Ok(merged)
    }
}
