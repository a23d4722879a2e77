use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};
use serde::Serialize;

use crate::analyzer::DerivedMetrics;
use crate::error::{CoachError, Result};
use crate::types::{elapsed_seconds, ActivityContext, ActivitySummary, StreamRecord};

/// Lager for strømdata, nøklet på aktivitets-id.
///
/// Pipeline spør lageret før API-et; motoren selv vet ingenting om lagring.
pub trait StreamStore {
    fn load(&self, activity_id: u64) -> Result<Option<StreamRecord>>;
    fn save(&self, activity_id: u64, rec: &StreamRecord) -> Result<()>;
}

/// Én CSV-fil per aktivitet: `<dir>/<id>.csv`.
#[derive(Debug, Clone)]
pub struct FileStreamStore {
    dir: PathBuf,
}

impl FileStreamStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, activity_id: u64) -> PathBuf {
        self.dir.join(format!("{activity_id}.csv"))
    }
}

impl StreamStore for FileStreamStore {
    fn load(&self, activity_id: u64) -> Result<Option<StreamRecord>> {
        let path = self.path_for(activity_id);
        if !path.exists() {
            return Ok(None);
        }
        let rec = read_stream_csv(&path)?;
        debug!("stream for {activity_id} loaded from {}", path.display());
        Ok(Some(rec))
    }

    fn save(&self, activity_id: u64, rec: &StreamRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(activity_id);
        write_stream_csv(&path, rec)?;
        info!("Saved detailed stream data to {}", path.display());
        Ok(())
    }
}

/// Minnebasert lager, for tester og tørrkjøringer.
#[derive(Debug, Default)]
pub struct MemoryStreamStore {
    inner: Mutex<HashMap<u64, StreamRecord>>,
}

impl MemoryStreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StreamStore for MemoryStreamStore {
    fn load(&self, activity_id: u64) -> Result<Option<StreamRecord>> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(&activity_id).cloned())
    }

    fn save(&self, activity_id: u64, rec: &StreamRecord) -> Result<()> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(activity_id, rec.clone());
        Ok(())
    }
}

/// Skriv strømtabellen som CSV: `time` først, deretter alle tilstedeværende kanaler.
pub fn write_stream_csv(path: &Path, rec: &StreamRecord) -> Result<()> {
    rec.validate()?;
    let present: Vec<(&str, &[f64])> = rec
        .channels()
        .into_iter()
        .filter_map(|(name, col)| col.map(|c| (name, c)))
        .collect();

    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["time"];
    header.extend(present.iter().map(|(name, _)| *name));
    wtr.write_record(&header)?;

    for (i, t) in rec.time.iter().enumerate() {
        let mut row = Vec::with_capacity(present.len() + 1);
        row.push(t.to_string());
        row.extend(present.iter().map(|(_, col)| col[i].to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Les en strømtabell. Ukjente kolonner (f.eks. `activity_name`) ignoreres;
/// tomme celler blir NaN slik at kolonnene forblir justert.
pub fn read_stream_csv(path: &Path) -> Result<StreamRecord> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let idx = |name: &str| headers.iter().position(|h| h == name);

    let time_idx = idx("time").ok_or(CoachError::MissingChannel("time"))?;
    let names = [
        "distance",
        "heartrate",
        "watts",
        "cadence",
        "altitude",
        "velocity_smooth",
        "grade_smooth",
        "latitude",
        "longitude",
    ];
    let cols: Vec<(usize, usize)> = names
        .iter()
        .enumerate()
        .filter_map(|(slot, name)| idx(name).map(|i| (slot, i)))
        .collect();

    let mut time = Vec::new();
    let mut data: Vec<Option<Vec<f64>>> = vec![None; names.len()];
    for (slot, _) in &cols {
        data[*slot] = Some(Vec::new());
    }

    for row in rdr.records() {
        let row = row?;
        let t = row.get(time_idx).unwrap_or("").trim();
        // pandas kan skrive heltall som "12.0"
        let t = t
            .parse::<u32>()
            .ok()
            .or_else(|| t.parse::<f64>().ok().and_then(elapsed_seconds))
            .ok_or_else(|| CoachError::InvalidData(format!("bad time value `{t}` in {}", path.display())))?;
        time.push(t);
        for (slot, i) in &cols {
            let v = row
                .get(*i)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN);
            if let Some(col) = data[*slot].as_mut() {
                col.push(v);
            }
        }
    }

    let mut it = data.into_iter();
    let mut next = || it.next().flatten();
    let rec = StreamRecord {
        time,
        distance: next(),
        heartrate: next(),
        watts: next(),
        cadence: next(),
        altitude: next(),
        velocity_smooth: next(),
        grade_smooth: next(),
        latitude: next(),
        longitude: next(),
    };
    rec.validate()?;
    Ok(rec)
}

/// Filoppsett under datakatalogen.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opprett alle underkataloger (idempotent).
    pub fn ensure(&self) -> Result<()> {
        for sub in ["streams", "detailed", "figures/detailed", "analysis"] {
            fs::create_dir_all(self.root.join(sub))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stream_store(&self) -> FileStreamStore {
        FileStreamStore::new(self.root.join("streams"))
    }

    pub fn activities_csv(&self) -> PathBuf {
        self.root.join("activities.csv")
    }

    pub fn detailed_json(&self, activity_id: u64) -> PathBuf {
        self.root.join("detailed").join(format!("{activity_id}.json"))
    }

    pub fn analysis_json(&self, activity_id: u64) -> PathBuf {
        self.root
            .join("detailed")
            .join(format!("{activity_id}_analysis.json"))
    }

    pub fn figures_dir(&self) -> PathBuf {
        self.root.join("figures")
    }

    pub fn visualization_dir(&self, folder_name: &str) -> PathBuf {
        self.root.join("figures").join("detailed").join(folder_name)
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join("analysis")
    }
}

/// Lagrer aktivitetslisten som CSV.
pub fn save_activities(activities: &[ActivitySummary], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for a in activities {
        wtr.serialize(a)?;
    }
    wtr.flush()?;
    info!("Activities saved to {}", path.display());
    Ok(())
}

/// Leser aktivitetslisten. Mangler filen returneres en tom liste.
pub fn load_activities(path: &Path) -> Result<Vec<ActivitySummary>> {
    if !path.exists() {
        info!("Data file {} not found", path.display());
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let rows = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<ActivitySummary>, _>>()?;
    info!("Loaded {} activities from {}", rows.len(), path.display());
    Ok(rows)
}

/// Lagrer en verdi som JSON (pretty-print).
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    debug!("wrote {}", path.display());
    Ok(())
}

pub fn save_analysis(metrics: &DerivedMetrics, path: &Path) -> Result<()> {
    save_json(metrics, path)?;
    info!("Analysis saved to {}", path.display());
    Ok(())
}

/// Leser lagret analyse som rå JSON (brukes av coach-formattering).
pub fn load_analysis(path: &Path) -> Result<Option<serde_json::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Leser detaljert aktivitet lagret fra Strava, om den finnes.
pub fn load_detailed(path: &Path) -> Result<Option<ActivityContext>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let mut de = serde_json::Deserializer::from_str(&contents);
    let ctx: ActivityContext = serde_path_to_error::deserialize(&mut de)?;
    Ok(Some(ctx))
}
