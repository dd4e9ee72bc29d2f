//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::adapters::{AnnexAddresser, ExifTool, files_in};
use crate::config::AlbuminConfig;
use albumin_core::primitives::{DATETIME_FIELD, TIMEZONE_FIELD};
use albumin_core::{
    AlbuminError, ContentKey, FieldValue, MetadataClient, Moment, ReconcileReport, Reconciler, Tz,
};
use std::path::PathBuf;

/// Run `f` against a freshly started metadata service, then stop it.
///
/// The service is stopped on every path; an error from `f` takes precedence
/// over an error while stopping.
fn with_client<T>(
    config: &AlbuminConfig,
    f: impl FnOnce(&mut MetadataClient) -> Result<T, AlbuminError>,
) -> Result<T, AlbuminError> {
    let mut client = MetadataClient::start(config.session()?)?;
    let result = f(&mut client);
    let closed = client.close(true);
    let value = result?;
    closed?;
    Ok(value)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// RECONCILE COMMANDS
// =============================================================================

/// Analyze (and with `apply`, record) capture dates for `paths`.
pub fn cmd_reconcile(
    config: &AlbuminConfig,
    paths: &[PathBuf],
    apply: bool,
    json_mode: bool,
) -> Result<(), AlbuminError> {
    let timezone = config.timezone()?;
    let files = files_in(paths)?;
    tracing::info!(files = files.len(), timezone = %timezone, apply, "starting pass");

    let mut source = ExifTool::new(config.exif.command.clone());
    let mut addresser = AnnexAddresser::new(config.annex.command.clone());
    let reconciler = Reconciler::new(timezone);

    let report = with_client(config, |client| {
        reconciler.run(&files, &mut source, &mut addresser, client, apply)
    })?;

    if json_mode {
        print_json(&report_json(&report));
        return Ok(());
    }

    print!("{report}");
    println!();
    for line in report.short() {
        println!("{line}");
    }
    if !apply && !report.updates.is_empty() {
        println!();
        println!("Run `albumin apply` to record these updates.");
    }
    Ok(())
}

/// Machine-readable form of a report.
pub fn report_json(report: &ReconcileReport) -> serde_json::Value {
    let additions: serde_json::Map<String, serde_json::Value> = report
        .additions()
        .iter()
        .filter_map(|(file, key)| {
            report.update_for(key).map(|update| {
                let entry = serde_json::json!({
                    "key": key.as_str(),
                    "datetime": update.new.moment().to_string(),
                    "method": update.new.method().as_str(),
                });
                (file.display().to_string(), entry)
            })
        })
        .collect();

    let overwrites: serde_json::Map<String, serde_json::Value> = report
        .overwrites()
        .iter()
        .filter_map(|(file, key)| {
            report.update_for(key).map(|update| {
                let entry = serde_json::json!({
                    "key": key.as_str(),
                    "datetime": update.new.moment().to_string(),
                    "method": update.new.method().as_str(),
                    "old_datetime": update.old.map(|old| old.moment().to_string()),
                    "old_method": update.old.map(|old| old.method().as_str()),
                });
                (file.display().to_string(), entry)
            })
        })
        .collect();

    let remaining: Vec<String> = report
        .remaining()
        .iter()
        .map(|file| file.display().to_string())
        .collect();

    serde_json::json!({
        "applied": report.applied,
        "additions": additions,
        "overwrites": overwrites,
        "remaining": remaining,
        "unchanged": report.unchanged().len(),
    })
}

// =============================================================================
// META COMMANDS
// =============================================================================

/// Print every non-reserved field of a record.
pub fn cmd_meta_show(
    config: &AlbuminConfig,
    key: &str,
    json_mode: bool,
) -> Result<(), AlbuminError> {
    let key = ContentKey::new(key);
    let zone = config.timezone().ok();

    let fields = with_client(config, |client| {
        let mut record = client.record(&key);
        let mut fields = Vec::new();
        for field in record.fields()? {
            let values = record.get_in(&field, zone)?.into_vec();
            fields.push((field, values));
        }
        Ok(fields)
    })?;

    if json_mode {
        let map: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|(field, values)| {
                let encoded: Vec<String> = values.iter().map(FieldValue::encode).collect();
                (field.clone(), serde_json::json!(encoded))
            })
            .collect();
        print_json(&serde_json::json!({ "key": key.as_str(), "fields": map }));
        return Ok(());
    }

    println!("{key}");
    if fields.is_empty() {
        println!("  (no metadata)");
    }
    for (field, values) in &fields {
        let shown: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("  {}: {}", field, shown.join(", "));
    }
    Ok(())
}

/// Make `field` hold exactly `values`.
pub fn cmd_meta_set(
    config: &AlbuminConfig,
    key: &str,
    field: &str,
    values: &[String],
) -> Result<(), AlbuminError> {
    let key = ContentKey::new(key);
    let zone = config.timezone().unwrap_or(Tz::UTC);
    let values = values
        .iter()
        .map(|raw| typed_value(field, raw, zone))
        .collect::<Result<Vec<_>, _>>()?;

    with_client(config, |client| client.record(&key).set(field, &values))?;
    tracing::info!(key = %key, field, "field updated");
    Ok(())
}

/// Remove every value of `field`.
pub fn cmd_meta_delete(
    config: &AlbuminConfig,
    key: &str,
    field: &str,
) -> Result<(), AlbuminError> {
    let key = ContentKey::new(key);
    with_client(config, |client| client.record(&key).delete(field))?;
    tracing::info!(key = %key, field, "field deleted");
    Ok(())
}

/// Interpret a command-line value for `field`.
///
/// `datetime` accepts either evidence layout as wall-clock time in `zone`;
/// `timezone` must name a known zone; anything else is text.
pub fn typed_value(field: &str, raw: &str, zone: Tz) -> Result<FieldValue, AlbuminError> {
    if field == DATETIME_FIELD {
        let moment = Moment::parse(raw)?.with_timezone(zone)?;
        Ok(FieldValue::DateTime(moment.zoned_or_utc()))
    } else if field == TIMEZONE_FIELD {
        raw.parse::<Tz>()
            .map(FieldValue::Zone)
            .map_err(|_| AlbuminError::InvalidEvidence(format!("unknown time zone: {raw}")))
    } else {
        Ok(FieldValue::from(raw))
    }
}
