//! The transformation engine
//!
//! A pure, single-pass, stateless transformation: given an adapter's
//! line-oriented result set, a target output header, and a transform spec,
//! produce the reshaped delimited blob. Either the whole result set is
//! transformed or the operation fails - there is no partial output.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::resolvers::{
    LookupTable, resolve_date, resolve_date_injection, resolve_simple,
};
use crate::tabular::{self, ResultSet};
use crate::transforms::{ResolverConfig, TransformSpec};

/// Transform a result set into the report schema.
///
/// Steps: header normalization (`add_header`/`modify_header`), header
/// extraction, row sanitization, per-row column resolution, serialization.
/// Passthrough always wins: an output column present verbatim in the input
/// header is copied directly, bypassing any configured resolver.
///
/// Configuration problems (`modify_header` naming an absent column, an
/// output column with neither a passthrough match nor a `Transformations`
/// entry) abort the invocation. Data-quality problems degrade to the
/// configured default or date sentinel per resolver.
pub fn transform(
    lines: &[String],
    output_header: &[String],
    spec: &TransformSpec,
    config: &EngineConfig,
) -> Result<String> {
    let separator = config.separator_char();
    let separator_str = separator.to_string();

    let mut normalized: Vec<String> = lines.to_vec();
    tracing::debug!(lines = normalized.len(), "transforming result set");

    if let Some(header_spec) = &spec.header {
        if let Some(added) = &header_spec.add_header {
            normalized.insert(0, added.join(&separator_str));
        }
        if let Some(renames) = &header_spec.modify_header {
            let current = normalized.first().cloned().unwrap_or_default();
            let mut header = if current.is_empty() {
                Vec::new()
            } else {
                tabular::split_line(&current, separator)
            };
            for (old_name, new_name) in renames {
                let index = header
                    .iter()
                    .position(|name| name == old_name)
                    .ok_or_else(|| Error::HeaderColumnNotFound {
                        column: old_name.clone(),
                    })?;
                header[index] = new_name.clone();
            }
            let joined = header.join(&separator_str);
            if normalized.is_empty() {
                normalized.push(joined);
            } else {
                normalized[0] = joined;
            }
        }
    }

    // Line 0 becomes the authoritative input header; the remaining rows are
    // sanitized before any resolution so resolvers never see quoting or
    // line-break artifacts.
    let ResultSet {
        header: input_header,
        rows,
    } = ResultSet::from_lines(&normalized, separator);

    let Some(transformations) = &spec.transformations else {
        // Pass-through mode: sanitized rows reheadered with the output header.
        return ResultSet {
            header: output_header.to_vec(),
            rows,
        }
        .to_delimited(config.separator);
    };

    // One "now" per invocation: every date_injection column resolves to the
    // same value across all rows.
    let now = Utc::now().with_timezone(&config.timezone);
    let mut tables: HashMap<PathBuf, Option<LookupTable>> = HashMap::new();

    let mut resolved = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut out_row = Vec::with_capacity(output_header.len());
        for column in output_header {
            if let Some(index) = input_header.iter().position(|name| name == column) {
                out_row.push(row.get(index).cloned().unwrap_or_default());
                continue;
            }
            let resolver = transformations
                .get(column)
                .ok_or_else(|| Error::ColumnUnresolved {
                    column: column.clone(),
                })?;
            let value = match resolver {
                ResolverConfig::Simple(simple) => {
                    let table = tables
                        .entry(simple.mapping_file.clone())
                        .or_insert_with(|| {
                            match LookupTable::load(&simple.mapping_file, config.separator) {
                                Ok(loaded) => Some(loaded),
                                Err(error) => {
                                    tracing::warn!(
                                        mapping_file = %simple.mapping_file.display(),
                                        %error,
                                        "lookup table unavailable, using defaults"
                                    );
                                    None
                                }
                            }
                        });
                    resolve_simple(row, column, simple, table.as_ref())
                }
                ResolverConfig::Date(date) => resolve_date(row, &input_header, date, config),
                ResolverConfig::DateInjection(injection) => {
                    resolve_date_injection(now, injection)
                }
            };
            out_row.push(value);
        }
        resolved.push(out_row);
    }

    ResultSet {
        header: output_header.to_vec(),
        rows: resolved,
    }
    .to_delimited(config.separator)
}
