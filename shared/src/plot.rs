use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use num_bigint::BigUint;
use tracing::*;

use crate::errors::{MinerError, MinerResult};

pub const SCOOP_SIZE: u64 = 64;
pub const SCOOPS_PER_PLOT: u64 = 4096;
/// Byte size of one plot record on disk.
pub const PLOT_SIZE: u64 = SCOOP_SIZE * SCOOPS_PER_PLOT;

const MAX_NUMBER_OF_PARTS: u64 = 100;
const DEFAULT_CHUNK_PART_NONCES: u64 = 320_000;

/// One plot file, partitioned into addressable chunk-part work units.
///
/// File names follow the `accountId_startNonce_numberOfPlots_staggerAmount`
/// convention; everything else about the file is derived from those four
/// fields, never from its content.
#[derive(Debug, Clone)]
pub struct PlotFile {
    path: PathBuf,
    filename: String,
    account_id: u64,
    start_nonce: BigUint,
    plots: u64,
    stagger: u64,
    number_of_chunks: u64,
    number_of_parts: u64,
    size: u64,
    // chunk-part start nonce -> part byte size
    chunk_part_start_nonces: HashMap<BigUint, u64>,
}

impl PlotFile {
    pub fn new<P: Into<PathBuf>>(path: P, chunk_part_nonces: Option<u64>) -> MinerResult<PlotFile> {
        let path = path.into();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MinerError::PlotFile(format!("unreadable file name: '{}'", path.display())))?
            .to_string();

        let fields: Vec<&str> = filename.split('_').collect();
        if fields.len() != 4 {
            return Err(MinerError::PlotFile(format!(
                "'{filename}' does not match 'accountId_startNonce_numberOfPlots_staggerAmount'"
            )));
        }

        let numeric = |name: &str, value: &str| -> MinerResult<u64> {
            value
                .parse::<u64>()
                .map_err(|_| MinerError::PlotFile(format!("'{filename}': invalid {name} '{value}'")))
        };

        let account_id = numeric("account id", fields[0])?;
        let start_nonce = fields[1]
            .parse::<BigUint>()
            .map_err(|_| MinerError::PlotFile(format!("'{filename}': invalid start nonce '{}'", fields[1])))?;
        let plots = numeric("number of plots", fields[2])?;
        let stagger = numeric("stagger amount", fields[3])?;

        if plots == 0 || stagger == 0 {
            return Err(MinerError::PlotFile(format!("'{filename}': zero plots or stagger")));
        }

        if plots % stagger != 0 {
            warn!("incomplete plot file '{filename}': stagger {stagger} does not divide plots {plots}");
        }

        let number_of_chunks = plots / stagger;
        let number_of_parts = calculate_number_of_parts(stagger, chunk_part_nonces);
        let size = number_of_chunks * stagger * PLOT_SIZE;

        if let Ok(meta) = fs::metadata(&path) {
            if meta.len() != size {
                debug!(
                    "plot file '{filename}' expected {size} bytes, found {} bytes on disk",
                    meta.len()
                );
            }
        }

        let mut chunk_part_start_nonces = HashMap::new();
        if number_of_chunks > 0 {
            let chunk_part_size = size / number_of_chunks / number_of_parts;
            for chunk in 0..number_of_chunks {
                for part in 0..number_of_parts {
                    let chunk_part_start_nonce =
                        &start_nonce + BigUint::from(chunk * stagger + part * (stagger / number_of_parts));
                    if chunk_part_start_nonces.insert(chunk_part_start_nonce, chunk_part_size).is_some() {
                        warn!("possible overlapping plot file '{filename}', please check your plots");
                    }
                }
            }
        }

        Ok(PlotFile {
            path,
            filename,
            account_id,
            start_nonce,
            plots,
            stagger,
            number_of_chunks,
            number_of_parts,
            size,
            chunk_part_start_nonces,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    pub fn start_nonce(&self) -> &BigUint {
        &self.start_nonce
    }

    pub fn plots(&self) -> u64 {
        self.plots
    }

    pub fn stagger(&self) -> u64 {
        self.stagger
    }

    pub fn number_of_chunks(&self) -> u64 {
        self.number_of_chunks
    }

    pub fn number_of_parts(&self) -> u64 {
        self.number_of_parts
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_part_start_nonces(&self) -> &HashMap<BigUint, u64> {
        &self.chunk_part_start_nonces
    }
}

// Splitting chunks into parts keeps read batches near the configured target
// while every part stays exactly the same byte size, which is what the
// scanning engine's buffer management relies on.
fn calculate_number_of_parts(stagger: u64, chunk_part_nonces: Option<u64>) -> u64 {
    let target = chunk_part_nonces.unwrap_or(DEFAULT_CHUNK_PART_NONCES);

    let mut suggested = stagger / target + 1;

    // stagger has to be dividable by the number of parts, adjust until it is
    while stagger % suggested != 0 && suggested < MAX_NUMBER_OF_PARTS {
        suggested += 1;
    }

    // no divisor in acceptable range, restart from the square root
    if suggested >= MAX_NUMBER_OF_PARTS {
        suggested = (stagger as f64).sqrt().floor() as u64;
        while stagger % suggested != 0 {
            suggested -= 1;
        }
    }
    suggested
}

/// All plot files discovered under the configured paths.
#[derive(Debug, Default)]
pub struct PlotFiles {
    plot_files: Vec<PlotFile>,
    total_size: u64,
}

impl PlotFiles {
    /// Walk the plot paths and build a descriptor per well-formed file.
    /// Foreign or malformed files are skipped with a warning, they never
    /// abort the scan.
    pub fn scan<S: AsRef<str>>(paths: &[S], chunk_part_nonces: Option<u64>) -> PlotFiles {
        let mut plot_files = vec![];
        for dir in paths {
            let dir = dir.as_ref();
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("unable to read plot path '{dir}': {err}");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                match PlotFile::new(path, chunk_part_nonces) {
                    Ok(plot_file) => plot_files.push(plot_file),
                    Err(err) => warn!("skipping: {err}"),
                }
            }
        }
        Self::collect(plot_files)
    }

    /// Assemble a set of already-parsed descriptors, flagging chunk-part
    /// keys claimed by more than one file. Ownership stays with each file,
    /// nothing is dropped here.
    pub fn collect(plot_files: Vec<PlotFile>) -> PlotFiles {
        let mut owners: HashMap<&BigUint, &str> = HashMap::new();
        for plot_file in &plot_files {
            for chunk_part_start_nonce in plot_file.chunk_part_start_nonces.keys() {
                if let Some(other) = owners.insert(chunk_part_start_nonce, plot_file.filename()) {
                    warn!(
                        "overlapping plot files '{}' and '{}' both cover start nonce {}, please check your plots",
                        other,
                        plot_file.filename(),
                        chunk_part_start_nonce
                    );
                }
            }
        }
        let total_size = plot_files.iter().map(|p| p.size).sum();
        PlotFiles { plot_files, total_size }
    }

    pub fn plot_files(&self) -> &[PlotFile] {
        &self.plot_files
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.plot_files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn plot(account: u64, start: u64, plots: u64, stagger: u64) -> PlotFile {
        PlotFile::new(format!("{account}_{start}_{plots}_{stagger}"), None).unwrap()
    }

    #[test]
    fn parses_naming_convention() {
        let file = plot(13667340915782261124, 600000, 992000, 8000);
        assert_eq!(file.account_id(), 13667340915782261124);
        assert_eq!(file.start_nonce(), &BigUint::from(600000u64));
        assert_eq!(file.plots(), 992000);
        assert_eq!(file.stagger(), 8000);
        assert_eq!(file.number_of_chunks(), 124);
        assert_eq!(file.size(), 124 * 8000 * PLOT_SIZE);
    }

    #[test]
    fn parts_always_divide_stagger() {
        let mut rng = StdRng::seed_from_u64(0x506c6f74);
        for _ in 0..200 {
            let stagger = rng.gen_range(1..=5_000_000u64);
            let chunks = rng.gen_range(1..=4u64);
            let file = plot(1, 0, stagger * chunks, stagger);

            assert_eq!(file.stagger() % file.number_of_parts(), 0, "stagger {stagger}");

            let work_units = file.chunk_part_start_nonces();
            assert_eq!(work_units.len() as u64, chunks * file.number_of_parts());
            let covered: u64 = work_units.values().sum();
            assert_eq!(covered, file.size(), "stagger {stagger} chunks {chunks}");
        }
    }

    #[test]
    fn parts_heuristic_picks_first_divisor_above_target() {
        let file = plot(1, 0, 4_000_000, 4_000_000);

        // first candidate 4_000_000 / 320_000 + 1 = 13, first divisor from there
        let mut expected = 13;
        while 4_000_000 % expected != 0 {
            expected += 1;
        }
        assert_eq!(expected, 16);
        assert_eq!(file.number_of_parts(), expected);
    }

    #[test]
    fn parts_heuristic_square_root_fallback() {
        // prime below the cap: the increment path walks all the way up to it
        let file = PlotFile::new("1_0_97_97", Some(10)).unwrap();
        assert_eq!(file.number_of_parts(), 97);

        // prime above the cap: no divisor below 100, fallback walks down from sqrt
        let file = PlotFile::new("1_0_101_101", Some(10)).unwrap();
        assert_eq!(file.number_of_parts(), 1);

        // 101 * 103: candidate starts beyond the cap, sqrt lands on 101
        let file = PlotFile::new("1_0_10403_10403", Some(100)).unwrap();
        assert_eq!(file.number_of_parts(), 101);
        assert_eq!(file.stagger() % file.number_of_parts(), 0);
    }

    #[test]
    fn work_units_are_contiguous_and_uniform() {
        let file = PlotFile::new("1_600000_3000_1000", Some(100)).unwrap();
        let step = file.stagger() / file.number_of_parts();
        let part_size = step * PLOT_SIZE;

        let mut keys: Vec<&BigUint> = file.chunk_part_start_nonces().keys().collect();
        keys.sort();

        assert_eq!(*keys[0], BigUint::from(600000u64));
        for pair in keys.windows(2) {
            assert_eq!(pair[1] - pair[0], BigUint::from(step));
        }
        let last = *keys.last().unwrap() + BigUint::from(step);
        assert_eq!(last, BigUint::from(600000u64 + file.plots()));

        for size in file.chunk_part_start_nonces().values() {
            assert_eq!(*size, part_size);
        }
    }

    #[test]
    fn incomplete_file_is_tolerated() {
        // 2500 plots at stagger 1000 leaves half a chunk unaccounted for
        let file = plot(1, 0, 2500, 1000);
        assert_eq!(file.number_of_chunks(), 2);
        assert_eq!(file.size(), 2 * 1000 * PLOT_SIZE);
    }

    #[test]
    fn malformed_names_are_rejected() {
        assert!(PlotFile::new("README.md", None).is_err());
        assert!(PlotFile::new("123_456_789", None).is_err());
        assert!(PlotFile::new("abc_0_100_100", None).is_err());
        assert!(PlotFile::new("1_0_100_0", None).is_err());
    }

    #[test]
    fn malformed_file_does_not_poison_the_scan() {
        let good = plot(1, 0, 1000, 1000);
        assert!(PlotFile::new("not a plot", None).is_err());
        let files = PlotFiles::collect(vec![good]);
        assert_eq!(files.plot_files().len(), 1);
        assert_eq!(files.total_size(), 1000 * PLOT_SIZE);
    }

    #[test]
    fn cross_file_overlap_keeps_both_descriptors() {
        // second file restarts inside the first file's nonce range
        let first = plot(7, 0, 1000, 100);
        let second = plot(7, 500, 1000, 100);
        let files = PlotFiles::collect(vec![first, second]);

        assert_eq!(files.plot_files().len(), 2);
        assert_eq!(files.total_size(), 2 * 1000 * PLOT_SIZE);
        for file in files.plot_files() {
            assert_eq!(file.chunk_part_start_nonces().len(), 10);
        }
    }

    #[test]
    fn start_nonce_beyond_u64() {
        let file = PlotFile::new("1_36893488147419103232_1000_1000", None).unwrap();
        let expected = "36893488147419103232".parse::<BigUint>().unwrap();
        assert_eq!(file.start_nonce(), &expected);
        assert!(file.chunk_part_start_nonces().contains_key(&expected));
    }
}
