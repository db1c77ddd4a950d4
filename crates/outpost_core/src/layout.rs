//! Layout and exclusion-zone persistence.
//!
//! Layouts are newline-delimited text records, one structure per line:
//!
//! ```text
//! <archetype id> <x> <y> <z> <pitch> <yaw> <roll> <nx> <ny> <nz> <pitch2> <yaw2> <roll2>
//! ```
//!
//! Exclusion zones use `<x> <y> <z> <radius> <height>`. The simulation
//! never touches the file system itself: every read and write goes
//! through a [`LayoutStore`].

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::error::{Result, SimError};
use crate::history::BuildRecord;
use crate::level::ExclusionZone;
use crate::math::Vec3;
use crate::structure::{Structure, StructureStore};

/// Name of the map's own embedded layout.
pub const BUILTIN_LAYOUT: &str = "*BUILTIN*";

/// Longest layout listing, in characters.
pub const MAX_LAYOUT_LIST: usize = 256;

/// Shortest layout file name that is listed, extension included.
pub const MIN_LAYOUT_FILE_NAME: usize = 5;

const LAYOUT_EXTENSION: &str = ".dat";

/// Byte storage for layout and exclusion-zone files, keyed by path.
pub trait LayoutStore {
    /// File names (with extension) directly inside `dir`, sorted.
    fn list(&self, dir: &str) -> Result<Vec<String>>;

    /// Contents of `path`, or `None` when it does not exist.
    fn read(&self, path: &str) -> Result<Option<String>>;

    /// Replace the contents of `path`.
    fn write(&mut self, path: &str, contents: &str) -> Result<()>;

    /// Whether `path` exists.
    fn exists(&self, path: &str) -> bool {
        matches!(self.read(path), Ok(Some(_)))
    }
}

/// Which layout to load on the next map start.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LayoutChoice {
    /// The structures embedded in the map.
    #[default]
    Builtin,
    /// A saved layout file.
    Named(String),
}

impl LayoutChoice {
    /// Interpret a layout name, treating [`BUILTIN_LAYOUT`] case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() || name.eq_ignore_ascii_case(BUILTIN_LAYOUT) {
            Self::Builtin
        } else {
            Self::Named(name.to_string())
        }
    }
}

impl fmt::Display for LayoutChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str(BUILTIN_LAYOUT),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// One structure of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    /// Structure kind.
    pub archetype: Archetype,
    /// Position.
    pub origin: Vec3,
    /// Orientation.
    pub angles: Vec3,
    /// Surface normal.
    pub normal: Vec3,
    /// Turret orientation.
    pub turret_angles: Vec3,
}

impl LayoutRecord {
    /// Snapshot of a placed structure.
    #[must_use]
    pub fn of(structure: &Structure) -> Self {
        Self {
            archetype: structure.archetype,
            origin: structure.origin,
            angles: structure.angles,
            normal: structure.normal,
            turret_angles: structure.turret_angles,
        }
    }

    /// Format as one layout line, without the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = self.archetype.id().to_string();
        for v in [self.origin, self.angles, self.normal, self.turret_angles] {
            for c in v.to_array() {
                line.push_str(&format!(" {c:.6}"));
            }
        }
        line
    }

    /// Parse one layout line. `line_no` is used for error reporting only.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::LayoutParse`] when the line does not hold an
    /// integer and twelve numbers, and [`SimError::UnknownArchetype`] for
    /// an id outside the archetype range.
    pub fn parse_line(line_no: usize, line: &str) -> Result<Self> {
        let parse_error = |message: String| SimError::LayoutParse {
            line: line_no,
            message,
        };
        let mut fields = line.split_whitespace();
        let id: i32 = fields
            .next()
            .ok_or_else(|| parse_error("empty line".to_string()))?
            .parse()
            .map_err(|e| parse_error(format!("bad archetype id: {e}")))?;
        let floats = parse_floats::<12>(&mut fields).map_err(parse_error)?;
        if fields.next().is_some() {
            return Err(parse_error("trailing fields".to_string()));
        }
        let archetype = Archetype::from_id(id)?;
        let v = |i: usize| Vec3::new(floats[i], floats[i + 1], floats[i + 2]);
        Ok(Self {
            archetype,
            origin: v(0),
            angles: v(3),
            normal: v(6),
            turret_angles: v(9),
        })
    }
}

impl From<&BuildRecord> for LayoutRecord {
    fn from(record: &BuildRecord) -> Self {
        Self {
            archetype: record.archetype,
            origin: record.origin,
            angles: record.angles,
            normal: record.normal,
            turret_angles: record.turret_angles,
        }
    }
}

fn parse_floats<'a, const N: usize>(
    fields: &mut impl Iterator<Item = &'a str>,
) -> std::result::Result<[f32; N], String> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let field = fields
            .next()
            .ok_or_else(|| format!("expected {N} numbers, found {i}"))?;
        *slot = field
            .parse()
            .map_err(|e| format!("bad number '{field}': {e}"))?;
    }
    Ok(out)
}

/// Store path of a named layout.
#[must_use]
pub fn layout_path(map: &str, name: &str) -> String {
    format!("layouts/{map}/{name}{LAYOUT_EXTENSION}")
}

/// Store path of a map's exclusion zones.
#[must_use]
pub fn exclusion_path(map: &str) -> String {
    format!("nobuild/{map}{LAYOUT_EXTENSION}")
}

/// Format layout records, one per line.
#[must_use]
pub fn format_layout(records: &[LayoutRecord]) -> String {
    records.iter().fold(String::new(), |mut out, r| {
        out.push_str(&r.to_line());
        out.push('\n');
        out
    })
}

/// Parse a layout, skipping blank lines and warning about bad ones.
#[must_use]
pub fn parse_layout(source: &str) -> Vec<LayoutRecord> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match LayoutRecord::parse_line(i + 1, line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping layout line");
                None
            }
        })
        .collect()
}

/// Save every live structure as a layout named `name`.
///
/// # Errors
///
/// Returns [`SimError::NoMapLoaded`] without a map, or the store's error.
pub fn save_layout(
    store: &mut dyn LayoutStore,
    map: Option<&str>,
    name: &str,
    structures: &StructureStore,
) -> Result<()> {
    let map = map.ok_or(SimError::NoMapLoaded)?;
    let records: Vec<LayoutRecord> = structures
        .iter()
        .filter(|s| s.is_alive())
        .map(LayoutRecord::of)
        .collect();
    let path = layout_path(map, name);
    tracing::info!(%path, count = records.len(), "Saving layout");
    store.write(&path, &format_layout(&records))
}

/// Layouts available for `map`: [`BUILTIN_LAYOUT`] first, then the saved
/// layout names without extension.
///
/// # Errors
///
/// Returns the store's error when the directory cannot be listed.
pub fn list_layouts(store: &dyn LayoutStore, map: &str) -> Result<Vec<String>> {
    let files = store.list(&format!("layouts/{map}"))?;
    let mut names = vec![BUILTIN_LAYOUT.to_string()];
    let mut len = BUILTIN_LAYOUT.len() + 1;
    let mut truncated = false;

    for file in files.iter().filter(|f| f.ends_with(LAYOUT_EXTENSION)) {
        if file.len() < MIN_LAYOUT_FILE_NAME {
            continue;
        }
        let stem = &file[..file.len() - LAYOUT_EXTENSION.len()];
        if len + stem.len() + 1 > MAX_LAYOUT_LIST {
            truncated = true;
            break;
        }
        len += stem.len() + 1;
        names.push(stem.to_string());
    }

    if truncated {
        tracing::warn!(
            map,
            listed = names.len() - 1,
            available = files.len(),
            "Layout list truncated"
        );
    }
    Ok(names)
}

/// Resolve the layout to load from the one-time `request` list.
///
/// `request` is cleared. An empty request with `auto` considers every
/// layout of the map. Names that do not exist are dropped with a warning;
/// when none remain the map default is used. Otherwise one name is picked
/// uniformly.
///
/// # Errors
///
/// Returns the store's error when listing fails.
pub fn select_layout(
    store: &dyn LayoutStore,
    map: &str,
    request: &mut String,
    auto: bool,
    rng: &mut impl Rng,
) -> Result<LayoutChoice> {
    let mut requested = std::mem::take(request);
    if requested.trim().is_empty() && auto {
        requested = list_layouts(store, map)?.join(" ");
    }
    if requested.trim().is_empty() {
        return Ok(LayoutChoice::Builtin);
    }

    let available: Vec<&str> = requested
        .split_whitespace()
        .filter(|name| {
            if name.eq_ignore_ascii_case(BUILTIN_LAYOUT) || store.exists(&layout_path(map, name)) {
                true
            } else {
                tracing::warn!(map, layout = %name, "Layout does not exist");
                false
            }
        })
        .collect();

    if available.is_empty() {
        tracing::error!(map, "None of the requested layouts exist, using map default");
        return Ok(LayoutChoice::Builtin);
    }

    let pick = available[rng.gen_range(0..available.len())];
    let choice = LayoutChoice::from_name(pick);
    tracing::info!(map, layout = %choice, from = %available.join(" "), "Layout selected");
    Ok(choice)
}

/// Records of the chosen layout. The map default and missing files yield
/// no records.
///
/// # Errors
///
/// Returns the store's error when reading fails.
pub fn load_layout(
    store: &dyn LayoutStore,
    map: &str,
    choice: &LayoutChoice,
) -> Result<Vec<LayoutRecord>> {
    let LayoutChoice::Named(name) = choice else {
        return Ok(Vec::new());
    };
    let path = layout_path(map, name);
    match store.read(&path)? {
        Some(source) => Ok(parse_layout(&source)),
        None => {
            tracing::warn!(%path, "Layout could not be opened");
            Ok(Vec::new())
        }
    }
}

/// Save the exclusion zones of `map`.
///
/// # Errors
///
/// Returns [`SimError::NoMapLoaded`] without a map, or the store's error.
pub fn save_exclusion_zones(
    store: &mut dyn LayoutStore,
    map: Option<&str>,
    zones: &[ExclusionZone],
) -> Result<()> {
    let map = map.ok_or(SimError::NoMapLoaded)?;
    let contents = zones.iter().fold(String::new(), |mut out, z| {
        out.push_str(&format!(
            "{:.6} {:.6} {:.6} {:.6} {:.6}\n",
            z.origin.x, z.origin.y, z.origin.z, z.radius, z.height
        ));
        out
    });
    let path = exclusion_path(map);
    tracing::info!(%path, count = zones.len(), "Saving exclusion zones");
    store.write(&path, &contents)
}

/// Parse one exclusion-zone line.
///
/// # Errors
///
/// Returns [`SimError::LayoutParse`] unless the line holds five numbers.
pub fn parse_zone_line(line_no: usize, line: &str) -> Result<ExclusionZone> {
    let mut fields = line.split_whitespace();
    let [x, y, z, radius, height] =
        parse_floats::<5>(&mut fields).map_err(|message| SimError::LayoutParse {
            line: line_no,
            message,
        })?;
    Ok(ExclusionZone {
        origin: Vec3::new(x, y, z),
        radius,
        height,
    })
}

/// Exclusion zones of `map`. A map without saved zones has none.
///
/// # Errors
///
/// Returns the store's error when reading fails.
pub fn load_exclusion_zones(store: &dyn LayoutStore, map: &str) -> Result<Vec<ExclusionZone>> {
    let Some(source) = store.read(&exclusion_path(map))? else {
        return Ok(Vec::new());
    };
    Ok(source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match parse_zone_line(i + 1, line) {
            Ok(zone) => Some(zone),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping exclusion zone line");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[derive(Default)]
    struct Files(BTreeMap<String, String>);

    impl LayoutStore for Files {
        fn list(&self, dir: &str) -> Result<Vec<String>> {
            let prefix = format!("{dir}/");
            Ok(self
                .0
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|k| !k.contains('/'))
                .map(str::to_string)
                .collect())
        }

        fn read(&self, path: &str) -> Result<Option<String>> {
            Ok(self.0.get(path).cloned())
        }

        fn write(&mut self, path: &str, contents: &str) -> Result<()> {
            self.0.insert(path.to_string(), contents.to_string());
            Ok(())
        }
    }

    fn record() -> LayoutRecord {
        LayoutRecord {
            archetype: Archetype::MgTurret,
            origin: Vec3::new(100.5, -20.0, 8.25),
            angles: Vec3::new(0.0, 90.0, 0.0),
            normal: Vec3::Z,
            turret_angles: Vec3::new(0.0, 90.0, 0.0),
        }
    }

    // ========================================================================
    // Records
    // ========================================================================

    #[test]
    fn test_line_has_id_and_twelve_numbers() {
        let line = record().to_line();
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 13);
        assert_eq!(fields[0], Archetype::MgTurret.id().to_string());
        assert_eq!(fields[1], "100.500000");
    }

    #[test]
    fn test_parse_line_reads_formatted_line() {
        let parsed = LayoutRecord::parse_line(1, &record().to_line()).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn test_parse_line_rejects_short_and_unknown() {
        assert!(matches!(
            LayoutRecord::parse_line(3, "9 1 2 3"),
            Err(SimError::LayoutParse { line: 3, .. })
        ));
        assert!(matches!(
            LayoutRecord::parse_line(1, "40 0 0 0 0 0 0 0 0 1 0 0 0"),
            Err(SimError::UnknownArchetype(40))
        ));
    }

    #[test]
    fn test_parse_layout_skips_bad_lines() {
        let source = format!("{}\ngarbage\n\n{}\n", record().to_line(), record().to_line());
        assert_eq!(parse_layout(&source).len(), 2);
    }

    // ========================================================================
    // Listing and selection
    // ========================================================================

    #[test]
    fn test_list_puts_builtin_first_and_strips_extension() {
        let mut store = Files::default();
        store.write("layouts/arachnid/alpha.dat", "").unwrap();
        store.write("layouts/arachnid/b.dat", "").unwrap();
        store.write("layouts/arachnid/notes.txt", "").unwrap();
        let names = list_layouts(&store, "arachnid").unwrap();
        assert_eq!(names, vec![BUILTIN_LAYOUT.to_string(), "alpha".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_list_truncates_long_listing() {
        let mut store = Files::default();
        for i in 0..40 {
            store
                .write(&format!("layouts/m/layout_{i:02}.dat"), "")
                .unwrap();
        }
        let names = list_layouts(&store, "m").unwrap();
        assert!(names.len() < 41);
        assert!(names.join(" ").len() < MAX_LAYOUT_LIST);
    }

    #[test]
    fn test_select_is_one_time_and_drops_missing() {
        let mut store = Files::default();
        store.write(&layout_path("m", "real"), "").unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut request = "ghost real".to_string();
        let choice = select_layout(&store, "m", &mut request, false, &mut rng).unwrap();
        assert_eq!(choice, LayoutChoice::Named("real".to_string()));
        assert!(request.is_empty());
    }

    #[test]
    fn test_select_falls_back_to_builtin() {
        let store = Files::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut request = "ghost".to_string();
        let choice = select_layout(&store, "m", &mut request, false, &mut rng).unwrap();
        assert_eq!(choice, LayoutChoice::Builtin);

        let mut empty = String::new();
        let choice = select_layout(&store, "m", &mut empty, false, &mut rng).unwrap();
        assert_eq!(choice, LayoutChoice::Builtin);
    }

    #[test]
    fn test_select_auto_picks_from_listing() {
        let mut store = Files::default();
        store.write(&layout_path("m", "fortress"), "").unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..64 {
            let mut request = String::new();
            seen.insert(select_layout(&store, "m", &mut request, true, &mut rng).unwrap());
        }
        assert!(seen.contains(&LayoutChoice::Named("fortress".to_string())));
        assert!(seen.contains(&LayoutChoice::Builtin));
    }

    // ========================================================================
    // Loading and saving
    // ========================================================================

    #[test]
    fn test_load_missing_or_builtin_is_empty() {
        let store = Files::default();
        assert!(load_layout(&store, "m", &LayoutChoice::Builtin).unwrap().is_empty());
        assert!(load_layout(&store, "m", &LayoutChoice::Named("none".into()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_save_needs_a_map() {
        let mut store = Files::default();
        let structures = StructureStore::new();
        assert!(matches!(
            save_layout(&mut store, None, "x", &structures),
            Err(SimError::NoMapLoaded)
        ));
    }

    #[test]
    fn test_exclusion_zones_save_and_load() {
        let mut store = Files::default();
        let zones = vec![ExclusionZone {
            origin: Vec3::new(1.0, 2.0, 3.0),
            radius: 50.0,
            height: 20.0,
        }];
        save_exclusion_zones(&mut store, Some("m"), &zones).unwrap();
        assert_eq!(
            store.read("nobuild/m.dat").unwrap().unwrap(),
            "1.000000 2.000000 3.000000 50.000000 20.000000\n"
        );
        assert_eq!(load_exclusion_zones(&store, "m").unwrap(), zones);
        assert!(load_exclusion_zones(&store, "other").unwrap().is_empty());
    }
}
