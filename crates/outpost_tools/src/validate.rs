//! Layout, exclusion-zone and data file validation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use outpost_core::archetype::Archetype;
use outpost_core::data::{ArchetypeTable, BuildConfig};
use outpost_core::faction::Faction;
use outpost_core::layout::{parse_zone_line, LayoutRecord};
use serde::Serialize;

use crate::error::{Result, ToolError};

/// Archetype override file inside a data directory.
pub const ARCHETYPES_FILE: &str = "buildables.ron";

/// Server tunables file inside a data directory.
pub const CONFIG_FILE: &str = "build_config.ron";

/// One problem found in a checked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// One-based line number, 0 for whole-file problems.
    pub line: usize,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            f.write_str(&self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

/// Outcome of checking a layout file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutReport {
    /// Records that parsed.
    pub records: Vec<LayoutRecord>,
    /// Everything that would be skipped or refused when loading.
    pub problems: Vec<Problem>,
}

impl LayoutReport {
    /// Whether the file loads without losses.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Number of records per faction.
    #[must_use]
    pub fn count(&self, faction: Faction) -> usize {
        self.records
            .iter()
            .filter(|r| r.archetype.faction() == faction)
            .count()
    }
}

/// Check a layout file line by line.
///
/// Besides parse errors this reports non-finite coordinates, a zero
/// normal, and unique archetypes that appear more than once.
#[must_use]
pub fn check_layout(source: &str, table: &ArchetypeTable) -> LayoutReport {
    let mut report = LayoutReport::default();
    let mut first_seen: BTreeMap<Archetype, usize> = BTreeMap::new();

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let record = match LayoutRecord::parse_line(line_no, line) {
            Ok(record) => record,
            Err(e) => {
                report.problems.push(Problem {
                    line: line_no,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let vectors = [record.origin, record.angles, record.normal, record.turret_angles];
        if !vectors.into_iter().all(|v| v.is_finite()) {
            report.problems.push(Problem {
                line: line_no,
                message: "non-finite number".to_string(),
            });
            continue;
        }
        if record.normal.length_squared() == 0.0 {
            report.problems.push(Problem {
                line: line_no,
                message: "zero surface normal, the structure will be placed upright".to_string(),
            });
        }
        if table.get(record.archetype).unique {
            if let Some(&first) = first_seen.get(&record.archetype) {
                report.problems.push(Problem {
                    line: line_no,
                    message: format!(
                        "second {} (first on line {first})",
                        record.archetype.display_name()
                    ),
                });
            } else {
                first_seen.insert(record.archetype, line_no);
            }
        }
        report.records.push(record);
    }

    for faction in [Faction::Aliens, Faction::Humans] {
        let has_core = report
            .records
            .iter()
            .any(|r| Archetype::core_of(faction) == Some(r.archetype));
        if report.count(faction) > 0 && !has_core {
            report.problems.push(Problem {
                line: 0,
                message: format!("{} structures without a core", faction.display_name()),
            });
        }
    }
    report
}

/// Check an exclusion-zone file line by line.
#[must_use]
pub fn check_exclusion_zones(source: &str) -> Vec<Problem> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match parse_zone_line(i + 1, line) {
            Ok(zone) if zone.radius <= 0.0 || zone.height <= 0.0 => Some(Problem {
                line: i + 1,
                message: "zone has no volume".to_string(),
            }),
            Ok(_) => None,
            Err(e) => Some(Problem {
                line: i + 1,
                message: e.to_string(),
            }),
        })
        .collect()
}

fn read(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ToolError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load the data files of a directory.
///
/// Missing files fall back to stock values. Returns the table and
/// tunables that a server started from `path` would use.
///
/// # Errors
///
/// Returns an error if a present file cannot be read or parsed.
pub fn load_data_directory(path: &Path) -> Result<(ArchetypeTable, BuildConfig)> {
    let archetypes = path.join(ARCHETYPES_FILE);
    let table = match read(&archetypes)? {
        Some(source) => ArchetypeTable::from_ron(&archetypes.display().to_string(), &source)?,
        None => ArchetypeTable::standard(),
    };

    let config_path = path.join(CONFIG_FILE);
    let config = match read(&config_path)? {
        Some(source) => BuildConfig::from_ron(&config_path.display().to_string(), &source)?,
        None => BuildConfig::default(),
    };
    Ok((table, config))
}

/// Validate the RON data files in a directory.
///
/// Beyond parsing, every archetype must cost no more than its faction's
/// pool, have positive health and a non-empty box.
///
/// # Errors
///
/// Returns an error if any data file fails validation.
pub fn validate_data_directory(path: &Path) -> Result<()> {
    let (table, config) = load_data_directory(path)?;
    let mut problems = 0;

    for row in table.iter() {
        let name = row.archetype.name();
        if row.health <= 0 {
            tracing::error!(archetype = name, health = row.health, "Health must be positive");
            problems += 1;
        }
        if row.mins.cmpge(row.maxs).any() {
            tracing::error!(archetype = name, mins = ?row.mins, maxs = ?row.maxs, "Empty bounding box");
            problems += 1;
        }
        let pool = config.max_build_points(row.archetype.faction());
        if row.build_points > pool {
            tracing::error!(archetype = name, cost = row.build_points, pool, "Cost exceeds the build point pool");
            problems += 1;
        }
    }

    if problems > 0 {
        return Err(ToolError::Invalid {
            path: path.display().to_string(),
            problems,
        });
    }
    tracing::info!(path = %path.display(), archetypes = table.iter().count(), "Data files valid");
    Ok(())
}
