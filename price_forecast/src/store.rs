//! Tuned-parameter store
//!
//! One JSON object keyed by commodity name. Every read goes to disk so
//! out-of-band edits are always visible. Writes replace the whole file through
//! a temporary sibling that is renamed over the original and then read back.

use crate::error::{ForecastError, Result};
use crate::models::{ModelOrder, ModelType, Sarima, SeasonalOrder};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Format of `tuning_date` in the store file
pub const TUNING_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a stored tuning date; a `T` separator and fractional seconds are
/// accepted too. The fraction is dropped: the store keeps whole seconds.
pub fn parse_tuning_date(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TUNING_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .map(truncate_to_seconds)
        .map_err(|e| {
            ForecastError::StoreParse(format!("Invalid tuning_date '{}': {}", text, e))
        })
}

fn truncate_to_seconds(date: NaiveDateTime) -> NaiveDateTime {
    date.with_nanosecond(0).unwrap_or(date)
}

mod tuning_date_format {
    use super::{parse_tuning_date, TUNING_DATE_FORMAT};
    use chrono::NaiveDateTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDateTime>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format(TUNING_DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| parse_tuning_date(&text).map_err(D::Error::custom))
            .transpose()
    }
}

/// Model specification of one commodity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityModelSpec {
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub model_type: ModelType,
    /// Whether the orders came from a completed search
    pub is_tuned: bool,
    #[serde(default)]
    pub aic: Option<f64>,
    #[serde(default)]
    pub bic: Option<f64>,
    #[serde(default, with = "tuning_date_format")]
    pub tuning_date: Option<NaiveDateTime>,
}

impl CommodityModelSpec {
    /// Untuned specification, as written by a bootstrap collaborator
    pub fn untuned(order: ModelOrder, seasonal_order: SeasonalOrder) -> Self {
        Self {
            order,
            seasonal_order,
            model_type: ModelType::for_seasonal(&seasonal_order),
            is_tuned: false,
            aic: None,
            bic: None,
            tuning_date: None,
        }
    }

    /// Specification produced by a completed search.
    ///
    /// A seasonal order without seasonal terms is committed as ARIMA with the
    /// zero quadruple. The tuning date is truncated to whole seconds.
    pub fn tuned(
        order: ModelOrder,
        seasonal_order: SeasonalOrder,
        aic: f64,
        bic: f64,
        tuning_date: NaiveDateTime,
    ) -> Self {
        let seasonal_order = seasonal_order.normalized();
        Self {
            order,
            seasonal_order,
            model_type: ModelType::for_seasonal(&seasonal_order),
            is_tuned: true,
            aic: Some(aic),
            bic: Some(bic),
            tuning_date: Some(truncate_to_seconds(tuning_date)),
        }
    }

    /// Clear the tuning metadata, keeping the orders
    pub fn reset(&mut self) {
        self.is_tuned = false;
        self.aic = None;
        self.bic = None;
        self.tuning_date = None;
    }

    /// Model described by this specification
    pub fn model(&self) -> Sarima {
        Sarima::for_type(self.model_type, self.order, self.seasonal_order)
    }

    /// Structural checks on a typed specification.
    ///
    /// A tuning date finer than whole seconds is a violation: the file could
    /// not hold it.
    pub fn validate(&self) -> ValidationReport {
        let mut violations = Vec::new();
        check_consistency(self.model_type, &self.seasonal_order, &mut violations);
        check_tuning(self.is_tuned, self.aic, self.bic, &mut violations);
        if let Some(date) = self.tuning_date.filter(|d| d.nanosecond() != 0) {
            violations.push(format!(
                "tuning_date {} has sub-second precision",
                date
            ));
        }
        ValidationReport::from_violations(violations)
    }
}

fn check_consistency(
    model_type: ModelType,
    seasonal_order: &SeasonalOrder,
    violations: &mut Vec<String>,
) {
    match (model_type, seasonal_order.is_none()) {
        (ModelType::Arima, false) => violations.push(format!(
            "model_type ARIMA requires seasonal_order (0,0,0,0), found {}",
            seasonal_order
        )),
        (ModelType::Sarima, true) => violations.push(
            "model_type SARIMA requires a non-zero seasonal_order".to_string(),
        ),
        _ => {}
    }
}

fn check_tuning(is_tuned: bool, aic: Option<f64>, bic: Option<f64>, violations: &mut Vec<String>) {
    for (name, value) in [("aic", aic), ("bic", bic)] {
        match value {
            Some(v) if !v.is_finite() => violations.push(format!("{} is not finite", name)),
            None if is_tuned => violations.push(format!("tuned record has no {}", name)),
            _ => {}
        }
    }
}

/// Pass/fail outcome of a structural check with every violation found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<String>,
}

impl ValidationReport {
    pub fn from_violations(violations: Vec<String>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

/// A record as it appears in the file, before structural validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub order: Vec<i64>,
    #[serde(default)]
    pub seasonal_order: Vec<i64>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub is_tuned: Option<bool>,
    #[serde(default)]
    pub aic: Option<f64>,
    #[serde(default)]
    pub bic: Option<f64>,
    #[serde(default)]
    pub tuning_date: Option<String>,
}

impl RawRecord {
    /// Convert into a typed specification, or list every violation.
    ///
    /// Records from older bootstrap files without `model_type` or `is_tuned`
    /// get the model type implied by the seasonal order and are untuned.
    pub fn into_spec(self) -> std::result::Result<CommodityModelSpec, Vec<String>> {
        let mut violations = Vec::new();

        let order = non_negative::<3>("order", &self.order, &mut violations);
        let seasonal = non_negative::<4>("seasonal_order", &self.seasonal_order, &mut violations);

        let model_type = match self.model_type.as_deref() {
            Some("ARIMA") => Some(ModelType::Arima),
            Some("SARIMA") => Some(ModelType::Sarima),
            Some(other) => {
                violations.push(format!("unknown model_type '{}'", other));
                None
            }
            None => None,
        };

        let is_tuned = self.is_tuned.unwrap_or(false);
        check_tuning(is_tuned, self.aic, self.bic, &mut violations);

        let tuning_date = match self.tuning_date.as_deref().map(parse_tuning_date) {
            Some(Ok(date)) => Some(date),
            Some(Err(err)) => {
                violations.push(err.to_string());
                None
            }
            None => None,
        };

        let (Some(order), Some(seasonal)) = (order, seasonal) else {
            return Err(violations);
        };
        let order = ModelOrder::from(order);
        let seasonal_order = SeasonalOrder::from(seasonal);
        let model_type = model_type.unwrap_or_else(|| ModelType::for_seasonal(&seasonal_order));
        check_consistency(model_type, &seasonal_order, &mut violations);

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(CommodityModelSpec {
            order,
            seasonal_order,
            model_type,
            is_tuned,
            aic: self.aic,
            bic: self.bic,
            tuning_date,
        })
    }
}

fn non_negative<const N: usize>(
    field: &str,
    values: &[i64],
    violations: &mut Vec<String>,
) -> Option<[usize; N]> {
    if values.len() != N {
        violations.push(format!(
            "{} must have {} entries, found {}",
            field,
            N,
            values.len()
        ));
        return None;
    }

    let mut out = [0usize; N];
    let mut ok = true;
    for (slot, &value) in out.iter_mut().zip(values) {
        match usize::try_from(value) {
            Ok(v) => *slot = v,
            Err(_) => {
                violations.push(format!("{} has negative entry {}", field, value));
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

/// Structural check of a single raw record
pub fn validate_record(record: &RawRecord) -> ValidationReport {
    match record.clone().into_spec() {
        Ok(_) => ValidationReport::from_violations(Vec::new()),
        Err(violations) => ValidationReport::from_violations(violations),
    }
}

/// Structural check of every record, violations prefixed by commodity
pub fn validate_records(records: &BTreeMap<String, RawRecord>) -> ValidationReport {
    let violations = records
        .iter()
        .flat_map(|(commodity, record)| {
            validate_record(record)
                .violations
                .into_iter()
                .map(move |v| format!("{}: {}", commodity, v))
        })
        .collect();
    ValidationReport::from_violations(violations)
}

/// Whole-file store of commodity model specifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamStore {
    path: PathBuf,
}

impl ParamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the raw records without structural validation
    pub fn load_raw(&self) -> Result<BTreeMap<String, RawRecord>> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                ForecastError::StoreNotFound(format!("{} does not exist", self.path.display()))
            }
            _ => ForecastError::IoError(e),
        })?;

        serde_json::from_str(&text).map_err(|e| {
            ForecastError::StoreParse(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Read and validate every record, fresh from disk
    pub fn load(&self) -> Result<BTreeMap<String, CommodityModelSpec>> {
        let mut specs = BTreeMap::new();
        let mut violations = Vec::new();

        for (commodity, record) in self.load_raw()? {
            match record.into_spec() {
                Ok(spec) => {
                    specs.insert(commodity, spec);
                }
                Err(errors) => violations
                    .extend(errors.into_iter().map(|e| format!("{}: {}", commodity, e))),
            }
        }

        if !violations.is_empty() {
            return Err(ForecastError::StoreParse(violations.join("; ")));
        }

        debug!(path = %self.path.display(), commodities = specs.len(), "loaded parameter store");
        Ok(specs)
    }

    /// Like [`load`](Self::load), but a missing file reads as an empty store
    pub fn load_or_empty(&self) -> Result<BTreeMap<String, CommodityModelSpec>> {
        match self.load() {
            Err(ForecastError::StoreNotFound(reason)) => {
                warn!(%reason, "parameter store missing, using an empty store");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    /// Known commodity names, sorted
    pub fn list_commodities(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }

    /// Specification of one commodity; `Ok(None)` when absent
    pub fn get(&self, commodity: &str) -> Result<Option<CommodityModelSpec>> {
        Ok(self.load()?.remove(commodity))
    }

    /// Check every record of the file without failing on violations
    pub fn validate(&self) -> Result<ValidationReport> {
        Ok(validate_records(&self.load_raw()?))
    }

    /// Replace the whole file with `specs`.
    ///
    /// Every spec must pass [`CommodityModelSpec::validate`], so what is
    /// written reads back unchanged.
    pub fn save(&self, specs: &BTreeMap<String, CommodityModelSpec>) -> Result<()> {
        let violations: Vec<String> = specs
            .iter()
            .flat_map(|(commodity, spec)| {
                spec.validate()
                    .violations
                    .into_iter()
                    .map(move |v| format!("{}: {}", commodity, v))
            })
            .collect();
        if !violations.is_empty() {
            return Err(ForecastError::InvalidParameter(violations.join("; ")));
        }

        self.write_atomic(specs)
    }

    /// Overwrite the specification of an existing commodity and verify it.
    ///
    /// The tuning date is truncated to whole seconds before validation.
    pub fn update(&self, commodity: &str, spec: &CommodityModelSpec) -> Result<()> {
        let mut written = spec.clone();
        written.tuning_date = written.tuning_date.map(truncate_to_seconds);

        let report = written.validate();
        if !report.valid {
            return Err(ForecastError::InvalidParameter(format!(
                "{}: {}",
                commodity,
                report.violations.join("; ")
            )));
        }

        let mut specs = self.load()?;
        let slot = specs.get_mut(commodity).ok_or_else(|| {
            ForecastError::StoreNotFound(format!(
                "Commodity '{}' is not in {}",
                commodity,
                self.path.display()
            ))
        })?;

        *slot = written.clone();

        self.write_atomic(&specs)?;
        self.verify(commodity, &written)?;

        info!(
            commodity,
            order = %written.order,
            seasonal_order = %written.seasonal_order,
            is_tuned = written.is_tuned,
            "parameter store updated"
        );
        Ok(())
    }

    /// Clear the tuning metadata of one commodity
    pub fn reset_tuning(&self, commodity: &str) -> Result<()> {
        let mut spec = self.get(commodity)?.ok_or_else(|| {
            ForecastError::StoreNotFound(format!(
                "Commodity '{}' is not in {}",
                commodity,
                self.path.display()
            ))
        })?;
        spec.reset();
        self.update(commodity, &spec)
    }

    /// Clear the tuning metadata of every commodity; returns how many were tuned
    pub fn reset_all(&self) -> Result<usize> {
        let mut specs = self.load()?;
        let tuned = specs.values().filter(|s| s.is_tuned).count();
        specs.values_mut().for_each(CommodityModelSpec::reset);

        self.write_atomic(&specs)?;
        let reloaded = self.load()?;
        if reloaded != specs {
            return Err(ForecastError::StoreVerification(
                "Store content differs from what was written after reset".to_string(),
            ));
        }

        info!(tuned, path = %self.path.display(), "tuning reset for every commodity");
        Ok(tuned)
    }

    fn verify(&self, commodity: &str, expected: &CommodityModelSpec) -> Result<()> {
        let reloaded = self.get(commodity)?;
        match reloaded {
            Some(actual) if actual == *expected => Ok(()),
            Some(actual) if actual.is_tuned != expected.is_tuned => {
                Err(ForecastError::StoreVerification(format!(
                    "'{}' reads back with is_tuned = {}, expected {}",
                    commodity, actual.is_tuned, expected.is_tuned
                )))
            }
            Some(_) => Err(ForecastError::StoreVerification(format!(
                "'{}' reads back different from what was written",
                commodity
            ))),
            None => Err(ForecastError::StoreVerification(format!(
                "'{}' is missing after the write",
                commodity
            ))),
        }
    }

    fn write_atomic(&self, specs: &BTreeMap<String, CommodityModelSpec>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = NamedTempFile::new_in(&dir)?;
        write_specs(&mut file, specs)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| ForecastError::IoError(e.error))?;
        Ok(())
    }
}

/// Pretty-print `specs` with four-space indentation and a trailing newline.
///
/// Serialization failures surface as [`ForecastError::IoError`].
fn write_specs<W: Write>(mut writer: W, specs: &BTreeMap<String, CommodityModelSpec>) -> Result<()> {
    {
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        specs
            .serialize(&mut serializer)
            .map_err(|e| ForecastError::IoError(std::io::Error::new(ErrorKind::Other, e)))?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_record_defaults() {
        let record: RawRecord =
            serde_json::from_str(r#"{"order": [1, 1, 1], "seasonal_order": [0, 1, 1, 52]}"#)
                .unwrap();
        let spec = record.into_spec().unwrap();

        assert_eq!(spec.model_type, ModelType::Sarima);
        assert!(!spec.is_tuned);
        assert_eq!(spec.aic, None);
    }

    #[test]
    fn test_record_violations_are_enumerated() {
        let record = RawRecord {
            order: vec![1, -1],
            seasonal_order: vec![0, 0, 0, 0],
            model_type: Some("SARIMA".to_string()),
            is_tuned: Some(true),
            ..RawRecord::default()
        };
        let report = validate_record(&record);

        assert!(!report.valid);
        assert_eq!(report.violations.len(), 3);
        assert!(report.violations[0].contains("order must have 3 entries"));
    }

    #[test]
    fn test_inconsistent_model_type() {
        let record = RawRecord {
            order: vec![1, 1, 1],
            seasonal_order: vec![1, 0, 0, 52],
            model_type: Some("ARIMA".to_string()),
            ..RawRecord::default()
        };
        let violations = record.into_spec().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("ARIMA"));
    }

    #[test]
    fn test_tuned_normalizes_seasonal_order() {
        let date = NaiveDateTime::parse_from_str("2024-05-01 10:20:30.75", "%Y-%m-%d %H:%M:%S%.f")
            .unwrap();
        let spec = CommodityModelSpec::tuned(
            ModelOrder::new(1, 1, 0),
            SeasonalOrder::new(0, 0, 0, 52),
            100.0,
            110.0,
            date,
        );

        assert_eq!(spec.model_type, ModelType::Arima);
        assert_eq!(spec.seasonal_order, SeasonalOrder::NONE);
        assert_eq!(
            spec.tuning_date.unwrap().format(TUNING_DATE_FORMAT).to_string(),
            "2024-05-01 10:20:30"
        );
        assert!(spec.validate().valid);
    }

    #[test]
    fn test_spec_serialization_shape() {
        let spec = CommodityModelSpec::untuned(ModelOrder::new(2, 1, 2), SeasonalOrder::new(1, 1, 1, 52));
        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(value["order"], serde_json::json!([2, 1, 2]));
        assert_eq!(value["seasonal_order"], serde_json::json!([1, 1, 1, 52]));
        assert_eq!(value["model_type"], "SARIMA");
        assert_eq!(value["tuning_date"], serde_json::Value::Null);
    }

    fn whole_second_date() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-01 01:02:03", TUNING_DATE_FORMAT).unwrap()
    }

    fn store_with_gula(dir: &tempfile::TempDir) -> ParamStore {
        let store = ParamStore::new(dir.path().join("params.json"));
        let mut specs = BTreeMap::new();
        specs.insert(
            "Gula".to_string(),
            CommodityModelSpec::untuned(ModelOrder::new(1, 1, 0), SeasonalOrder::NONE),
        );
        store.save(&specs).unwrap();
        store
    }

    #[test]
    fn test_sub_second_tuning_date_is_a_violation() {
        let mut spec = CommodityModelSpec::tuned(
            ModelOrder::new(1, 1, 0),
            SeasonalOrder::NONE,
            100.0,
            110.0,
            whole_second_date(),
        );
        assert!(spec.validate().valid);

        spec.tuning_date = Some(whole_second_date() + chrono::Duration::milliseconds(500));
        let report = spec.validate();
        assert!(!report.valid);
        assert!(report.violations[0].contains("sub-second"));
    }

    #[test]
    fn test_fractional_seconds_are_dropped_on_parse() {
        let parsed = parse_tuning_date("2024-05-01T01:02:03.500").unwrap();
        assert_eq!(parsed, whole_second_date());
    }

    #[test]
    fn test_verify_detects_mismatched_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_gula(&dir);
        let on_disk = store.get("Gula").unwrap().unwrap();
        assert!(store.verify("Gula", &on_disk).is_ok());

        let tuned = CommodityModelSpec::tuned(
            ModelOrder::new(1, 1, 0),
            SeasonalOrder::NONE,
            100.0,
            110.0,
            whole_second_date(),
        );
        let err = store.verify("Gula", &tuned).unwrap_err();
        assert!(matches!(err, ForecastError::StoreVerification(_)));
        assert!(err.to_string().contains("is_tuned"));

        let other_order = CommodityModelSpec::untuned(ModelOrder::new(2, 1, 0), SeasonalOrder::NONE);
        assert!(matches!(
            store.verify("Gula", &other_order),
            Err(ForecastError::StoreVerification(_))
        ));

        assert!(matches!(
            store.verify("Cabai Rawit", &on_disk),
            Err(ForecastError::StoreVerification(_))
        ));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_an_io_error() {
        let mut specs = BTreeMap::new();
        specs.insert(
            "Gula".to_string(),
            CommodityModelSpec::untuned(ModelOrder::new(1, 1, 0), SeasonalOrder::NONE),
        );

        let err = write_specs(FullDisk, &specs).unwrap_err();
        assert!(matches!(err, ForecastError::IoError(_)));
        assert_eq!(err.kind(), "IoError");

        let mut buffer = Vec::new();
        write_specs(&mut buffer, &specs).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("{\n    \"Gula\": {"));
        assert!(text.ends_with("}\n"));
    }
}
