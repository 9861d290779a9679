//! Clearance standard tables and the multi-standard lookup
//!
//! Each table maps ascending voltage thresholds to a required clearance.
//! A lookup picks the smallest tabulated voltage at or above the request;
//! requests beyond the table use the table's top entry. Nothing is ever
//! extrapolated.

use super::error::ConfigurationError;
use super::types::InsulationClass;
use indexmap::IndexMap;
use serde::Serialize;

/// One tabulated step: voltages up to `max_voltage` need `clearance_mm`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableRow {
    pub max_voltage: f64,
    pub clearance_mm: f64,
}

/// Table body, either shared by all insulation classes or split per class
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRows {
    Uniform(Vec<TableRow>),
    ByInsulation(IndexMap<InsulationClass, Vec<TableRow>>),
}

/// A named clearance standard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearanceStandardTable {
    name: String,
    rows: TableRows,
}

impl ClearanceStandardTable {
    /// Table whose clearance does not depend on insulation class
    pub fn uniform(name: impl Into<String>, rows: &[(f64, f64)]) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let rows = build_rows(&name, rows)?;
        Ok(Self {
            name,
            rows: TableRows::Uniform(rows),
        })
    }

    /// Table partitioned by insulation class
    pub fn by_insulation(
        name: impl Into<String>,
        functional: &[(f64, f64)],
        basic: &[(f64, f64)],
        reinforced: &[(f64, f64)],
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let mut partitions = IndexMap::new();
        for (class, rows) in [
            (InsulationClass::Functional, functional),
            (InsulationClass::Basic, basic),
            (InsulationClass::Reinforced, reinforced),
        ] {
            partitions.insert(class, build_rows(&name, rows)?);
        }
        Ok(Self {
            name,
            rows: TableRows::ByInsulation(partitions),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &TableRows {
        &self.rows
    }

    fn partition(&self, class: InsulationClass) -> &[TableRow] {
        match &self.rows {
            TableRows::Uniform(rows) => rows,
            // Every class is present by construction
            TableRows::ByInsulation(parts) => parts.get(&class).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Highest tabulated voltage for a class
    pub fn max_voltage(&self, class: InsulationClass) -> Option<f64> {
        self.partition(class).last().map(|row| row.max_voltage)
    }

    /// Required clearance in millimeters for a voltage and class
    pub fn lookup(&self, voltage: f64, class: InsulationClass) -> f64 {
        let rows = self.partition(class);
        rows.iter()
            .find(|row| voltage <= row.max_voltage)
            .or_else(|| rows.last())
            .map(|row| row.clearance_mm)
            .unwrap_or(0.0)
    }
}

fn build_rows(name: &str, rows: &[(f64, f64)]) -> Result<Vec<TableRow>, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidTable {
        standard: name.to_string(),
        reason,
    };

    if rows.is_empty() {
        return Err(invalid("table has no entries".to_string()));
    }

    let mut out: Vec<TableRow> = Vec::with_capacity(rows.len());
    for &(max_voltage, clearance_mm) in rows {
        if !max_voltage.is_finite() || max_voltage < 0.0 {
            return Err(invalid(format!("voltage {} is not a valid threshold", max_voltage)));
        }
        if !clearance_mm.is_finite() || clearance_mm < 0.0 {
            return Err(invalid(format!("clearance {}mm at {}V is invalid", clearance_mm, max_voltage)));
        }
        if let Some(prev) = out.last() {
            if max_voltage <= prev.max_voltage {
                return Err(invalid(format!(
                    "voltages must be strictly ascending ({}V follows {}V)",
                    max_voltage, prev.max_voltage
                )));
            }
        }
        out.push(TableRow { max_voltage, clearance_mm });
    }
    Ok(out)
}

/// IEC 61010-1 (measurement equipment), partitioned by insulation class
pub fn iec_61010_1() -> ClearanceStandardTable {
    const FUNCTIONAL: &[(f64, f64)] = &[
        (50.0, 0.5), (100.0, 1.0), (150.0, 1.5), (200.0, 2.0), (250.0, 3.0), (300.0, 3.5),
        (400.0, 4.0), (500.0, 5.0), (600.0, 6.0), (800.0, 8.0), (1000.0, 10.0),
    ];
    const BASIC: &[(f64, f64)] = &[
        (50.0, 0.5), (100.0, 1.0), (150.0, 1.5), (200.0, 2.0), (250.0, 4.0), (300.0, 4.5),
        (400.0, 5.5), (500.0, 6.5), (600.0, 8.0), (800.0, 10.0), (1000.0, 12.0),
    ];
    const REINFORCED: &[(f64, f64)] = &[
        (50.0, 1.0), (100.0, 2.0), (150.0, 3.0), (200.0, 4.0), (250.0, 8.0), (300.0, 9.0),
        (400.0, 11.0), (500.0, 13.0), (600.0, 16.0), (800.0, 20.0), (1000.0, 24.0),
    ];

    ClearanceStandardTable {
        name: "IEC 61010-1".to_string(),
        rows: TableRows::ByInsulation(IndexMap::from([
            (InsulationClass::Functional, to_rows(FUNCTIONAL)),
            (InsulationClass::Basic, to_rows(BASIC)),
            (InsulationClass::Reinforced, to_rows(REINFORCED)),
        ])),
    }
}

/// IEC 61439-1 (low-voltage switchgear), one table for all classes
pub fn iec_61439_1() -> ClearanceStandardTable {
    const ROWS: &[(f64, f64)] = &[
        (50.0, 1.0), (100.0, 1.5), (150.0, 2.0), (200.0, 2.5), (250.0, 3.0), (300.0, 3.5),
        (400.0, 4.0), (500.0, 5.0), (600.0, 6.0), (800.0, 8.0), (1000.0, 10.0),
    ];

    ClearanceStandardTable {
        name: "IEC 61439-1".to_string(),
        rows: TableRows::Uniform(to_rows(ROWS)),
    }
}

fn to_rows(rows: &[(f64, f64)]) -> Vec<TableRow> {
    rows.iter()
        .map(|&(max_voltage, clearance_mm)| TableRow { max_voltage, clearance_mm })
        .collect()
}

/// Normalize a standard name: case-insensitive, punctuation ignored
pub fn canonical_standard_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Governing requirement for one rating, with the per-standard breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearanceRequirement {
    pub voltage: f64,
    pub current: f64,
    pub insulation_class: InsulationClass,
    pub worst_case_mm: f64,
    pub by_standard: IndexMap<String, f64>,
}

impl ClearanceRequirement {
    /// Human-readable summary of the requirement
    pub fn description(&self) -> String {
        let mut desc = format!(
            "Minimum clearance: {:.2}mm for {}V, {}A",
            self.worst_case_mm, self.voltage, self.current
        );
        if self.by_standard.len() > 1 {
            let parts: Vec<String> = self
                .by_standard
                .iter()
                .map(|(name, mm)| format!("{}: {:.2}mm", name, mm))
                .collect();
            desc.push_str(&format!(" (worst case of: {})", parts.join(", ")));
        } else if let Some(name) = self.by_standard.keys().next() {
            desc.push_str(&format!(" (per {})", name));
        }
        desc
    }
}

/// Registry of clearance standards keyed by canonical name
#[derive(Debug, Clone, Default)]
pub struct StandardsLookup {
    tables: IndexMap<String, ClearanceStandardTable>,
}

impl StandardsLookup {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding IEC 61010-1 and IEC 61439-1
    pub fn iec() -> Self {
        let mut lookup = Self::new();
        for table in [iec_61010_1(), iec_61439_1()] {
            lookup.tables.insert(canonical_standard_name(table.name()), table);
        }
        lookup
    }

    pub fn register(&mut self, table: ClearanceStandardTable) -> Result<(), ConfigurationError> {
        let key = canonical_standard_name(table.name());
        if self.tables.contains_key(&key) {
            return Err(ConfigurationError::DuplicateStandard(table.name().to_string()));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    pub fn tables(&self) -> impl Iterator<Item = &ClearanceStandardTable> {
        self.tables.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.values().map(|t| t.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ClearanceStandardTable> {
        self.tables.get(&canonical_standard_name(name))
    }

    /// Resolve requested names to tables, rejecting empty or unknown selections
    pub fn resolve<S: AsRef<str>>(
        &self,
        standards: &[S],
    ) -> Result<Vec<&ClearanceStandardTable>, ConfigurationError> {
        if standards.is_empty() {
            return Err(ConfigurationError::NoStandards);
        }
        let mut resolved: Vec<&ClearanceStandardTable> = Vec::with_capacity(standards.len());
        for name in standards {
            let table = self
                .get(name.as_ref())
                .ok_or_else(|| ConfigurationError::UnknownStandard(name.as_ref().to_string()))?;
            if !resolved.iter().any(|t| std::ptr::eq(*t, table)) {
                resolved.push(table);
            }
        }
        Ok(resolved)
    }

    /// Worst-case required clearance across the requested standards.
    ///
    /// `current` is carried through to the requirement but none of the
    /// registered tables key on it, so it does not change the result.
    pub fn required_clearance_mm<S: AsRef<str>>(
        &self,
        voltage: f64,
        current: f64,
        insulation_class: InsulationClass,
        standards: &[S],
    ) -> Result<ClearanceRequirement, ConfigurationError> {
        if !voltage.is_finite() || voltage < 0.0 {
            return Err(ConfigurationError::InvalidVoltage(voltage));
        }
        let tables = self.resolve(standards)?;

        let by_standard: IndexMap<String, f64> = tables
            .iter()
            .map(|table| (table.name().to_string(), table.lookup(voltage, insulation_class)))
            .collect();
        let worst_case_mm = by_standard.values().copied().fold(0.0, f64::max);

        Ok(ClearanceRequirement {
            voltage,
            current,
            insulation_class,
            worst_case_mm,
            by_standard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: [&str; 2] = ["IEC 61010-1", "IEC 61439-1"];

    #[test]
    fn test_230v_basic_worst_case() {
        let lookup = StandardsLookup::iec();
        let req = lookup
            .required_clearance_mm(230.0, 80.0, InsulationClass::Basic, &BOTH)
            .unwrap();
        assert_eq!(req.by_standard["IEC 61010-1"], 4.0);
        assert_eq!(req.by_standard["IEC 61439-1"], 3.0);
        assert_eq!(req.worst_case_mm, 4.0);
    }

    #[test]
    fn test_exact_threshold_uses_that_row() {
        let table = iec_61439_1();
        assert_eq!(table.lookup(250.0, InsulationClass::Basic), 3.0);
        assert_eq!(table.lookup(250.01, InsulationClass::Basic), 3.5);
        assert_eq!(table.lookup(0.0, InsulationClass::Basic), 1.0);
    }

    #[test]
    fn test_beyond_table_uses_maximum_entry() {
        let table = iec_61010_1();
        for class in InsulationClass::ALL {
            let top = table.lookup(1000.0, class);
            assert_eq!(table.lookup(1500.0, class), top);
            assert_eq!(table.lookup(1.0e6, class), top);
        }
        assert_eq!(table.lookup(5000.0, InsulationClass::Reinforced), 24.0);
        assert_eq!(table.max_voltage(InsulationClass::Basic), Some(1000.0));
    }

    #[test]
    fn test_monotonic_in_voltage() {
        let lookup = StandardsLookup::iec();
        for class in InsulationClass::ALL {
            let mut prev = 0.0;
            for step in 0..=240 {
                let v = step as f64 * 5.0;
                let req = lookup.required_clearance_mm(v, 0.0, class, &BOTH).unwrap();
                assert!(req.worst_case_mm >= prev, "{} at {}V", class, v);
                prev = req.worst_case_mm;
            }
        }
    }

    #[test]
    fn test_current_has_no_effect() {
        let lookup = StandardsLookup::iec();
        let a = lookup.required_clearance_mm(400.0, 0.0, InsulationClass::Reinforced, &BOTH).unwrap();
        let b = lookup.required_clearance_mm(400.0, 125.0, InsulationClass::Reinforced, &BOTH).unwrap();
        assert_eq!(a.worst_case_mm, b.worst_case_mm);
        assert_eq!(a.by_standard, b.by_standard);
    }

    #[test]
    fn test_standard_names_are_normalized() {
        let lookup = StandardsLookup::iec();
        assert!(lookup.get("IEC_61010_1").is_some());
        assert!(lookup.get("iec61439-1").is_some());

        // The same table requested twice is counted once
        let tables = lookup.resolve(&["IEC_61010_1", "IEC 61010-1"]).unwrap();
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_configuration_errors() {
        let lookup = StandardsLookup::iec();
        let none: [&str; 0] = [];
        assert_eq!(
            lookup.required_clearance_mm(230.0, 0.0, InsulationClass::Basic, &none),
            Err(ConfigurationError::NoStandards)
        );
        assert_eq!(
            lookup.required_clearance_mm(230.0, 0.0, InsulationClass::Basic, &["UL 840"]),
            Err(ConfigurationError::UnknownStandard("UL 840".to_string()))
        );
        assert!(matches!(
            lookup.required_clearance_mm(-1.0, 0.0, InsulationClass::Basic, &BOTH),
            Err(ConfigurationError::InvalidVoltage(_))
        ));
    }

    #[test]
    fn test_register_custom_table() {
        let mut lookup = StandardsLookup::iec();
        let table = ClearanceStandardTable::uniform("Internal 42", &[(120.0, 2.0), (480.0, 6.0)]).unwrap();
        lookup.register(table.clone()).unwrap();
        assert_eq!(lookup.register(table), Err(ConfigurationError::DuplicateStandard("Internal 42".to_string())));

        let req = lookup
            .required_clearance_mm(230.0, 0.0, InsulationClass::Functional, &["internal-42", "IEC 61010-1"])
            .unwrap();
        assert_eq!(req.by_standard["Internal 42"], 6.0);
        assert_eq!(req.by_standard["IEC 61010-1"], 3.0);
        assert_eq!(req.worst_case_mm, 6.0);
    }

    #[test]
    fn test_invalid_tables_rejected() {
        assert!(ClearanceStandardTable::uniform("empty", &[]).is_err());
        assert!(ClearanceStandardTable::uniform("unsorted", &[(100.0, 1.0), (50.0, 0.5)]).is_err());
        assert!(ClearanceStandardTable::uniform("nan", &[(100.0, f64::NAN)]).is_err());
        assert!(ClearanceStandardTable::by_insulation("split", &[(50.0, 1.0)], &[], &[(50.0, 2.0)]).is_err());
    }

    #[test]
    fn test_requirement_description() {
        let lookup = StandardsLookup::iec();
        let req = lookup.required_clearance_mm(230.0, 80.0, InsulationClass::Basic, &BOTH).unwrap();
        assert_eq!(
            req.description(),
            "Minimum clearance: 4.00mm for 230V, 80A (worst case of: IEC 61010-1: 4.00mm, IEC 61439-1: 3.00mm)"
        );

        let req = lookup.required_clearance_mm(48.0, 2.5, InsulationClass::Basic, &["IEC 61439-1"]).unwrap();
        assert_eq!(req.description(), "Minimum clearance: 1.00mm for 48V, 2.5A (per IEC 61439-1)");
    }
}
