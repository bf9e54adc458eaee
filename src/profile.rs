//! Profile files and their upload to the controller.
//!
//! A profile is a header record followed by up to 99 step records, each 15
//! words wide. Uploading writes the header block at register 200 and each
//! step at the following 15-register stride, after confirming the controller
//! is online, and confirms it is online again once the last block lands.

use crate::connection::{self, Connection};
use crate::registers;
use std::time::Duration;
use tracing::{debug, info};

/// First register of the profile memory window (the header block).
pub const BASE_ADDRESS: u16 = 200;
pub const WORDS_PER_RECORD: usize = 15;
/// The controller stores at most this many steps per profile.
pub const MAX_STEPS: i16 = 99;
/// Position of the declared step count within the header record.
const STEP_COUNT_FIELD: usize = 9;

const READINESS_ATTEMPTS: u32 = 10;
const READINESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("the profile file has no header row")]
    Empty,
    #[error("row {row} carries {found} fields where at least {} are required", WORDS_PER_RECORD)]
    ShortRow { row: usize, found: usize },
    #[error("row {row}, field {field}: `{text}` is not a value the controller can store")]
    BadField { row: usize, field: usize, text: String },
    #[error("the header declares {declared} steps; the controller holds at most {}", MAX_STEPS)]
    TooManySteps { declared: i16 },
    #[error("the header declares {declared} steps but the file only has {found}")]
    MissingSteps { declared: i16, found: usize },
    #[error("the controller did not report itself online in {} attempts", READINESS_ATTEMPTS)]
    NeverOnline,
    #[error("uploading block {confirmed} of {total} failed")]
    Upload {
        confirmed: usize,
        total: usize,
        #[source]
        source: connection::Error,
    },
}

/// One 15-word block of profile memory, already in wire units.
#[derive(Clone, Debug, PartialEq)]
pub struct Record(pub [i16; WORDS_PER_RECORD]);

impl Record {
    fn parse_row(row: usize, line: &str) -> Result<Record, Error> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < WORDS_PER_RECORD {
            return Err(Error::ShortRow { row, found: fields.len() });
        }
        let mut words = [0i16; WORDS_PER_RECORD];
        // Fields beyond the record width are ignored (trailing commas,
        // spreadsheet padding).
        for (field, (word, text)) in std::iter::zip(&mut words, fields).enumerate() {
            *word = parse_field(text).ok_or_else(|| Error::BadField {
                row,
                field: field + 1,
                text: text.to_string(),
            })?;
        }
        Ok(Record(words))
    }

    fn words(&self) -> Vec<u16> {
        self.0.iter().map(|v| *v as u16).collect()
    }
}

/// Integers pass through as raw wire units; fractional values are scaled by
/// ten and truncated toward zero, the same convention the controller's own
/// profile files use.
fn parse_field(text: &str) -> Option<i16> {
    if let Ok(value) = text.parse::<i16>() {
        return Some(value);
    }
    let scaled = (text.parse::<f64>().ok()? * 10.0).trunc();
    if !(f64::from(i16::MIN)..=f64::from(i16::MAX)).contains(&scaled) {
        return None;
    }
    Some(scaled as i16)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    header: Record,
    steps: Vec<Record>,
}

impl Profile {
    /// Validates the header's declared step count against the rows that
    /// follow it. Missing steps are fatal; surplus rows are dropped.
    pub fn new(header: Record, mut steps: Vec<Record>) -> Result<Profile, Error> {
        let declared = header.0[STEP_COUNT_FIELD];
        if !(0..=MAX_STEPS).contains(&declared) {
            return Err(Error::TooManySteps { declared });
        }
        let declared_len = declared as usize;
        if steps.len() < declared_len {
            return Err(Error::MissingSteps { declared, found: steps.len() });
        }
        steps.truncate(declared_len);
        Ok(Profile { header, steps })
    }

    /// Parses the comma-separated profile file format: one header row, one
    /// row per step. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Profile, Error> {
        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(Record::parse_row(index + 1, line)?);
        }
        let Some((header, steps)) = records.split_first() else {
            return Err(Error::Empty);
        };
        Profile::new(header.clone(), steps.to_vec())
    }

    /// The profile name packed into the header's five character-pair words.
    pub fn name(&self) -> String {
        self.header.0[4..9]
            .iter()
            .flat_map(|word| word.to_be_bytes())
            .map(|byte| if (32..=126).contains(&byte) { byte as char } else { ' ' })
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Every block of the upload in transmission order: the header at the
    /// base address, then each step one stride further.
    pub fn blocks(&self) -> impl Iterator<Item = (u16, Vec<u16>)> + '_ {
        std::iter::once((BASE_ADDRESS, self.header.words())).chain(
            self.steps.iter().enumerate().map(|(index, step)| {
                let offset = WORDS_PER_RECORD as u16 * (index as u16 + 1);
                (BASE_ADDRESS + offset, step.words())
            }),
        )
    }
}

/// Uploads a profile into the controller's profile memory.
///
/// Returns the number of blocks the controller confirmed. Pacing between
/// blocks is the connection's ordinary inter-exchange quiet period; nothing
/// is transmitted before the controller reports itself online, and the
/// upload only counts as done once it reports online again afterwards.
pub async fn upload(connection: &Connection, profile: &Profile) -> Result<usize, Error> {
    wait_until_online(connection).await?;
    let total = profile.step_count() + 1;
    let mut confirmed = 0;
    for (address, words) in profile.blocks() {
        connection
            .write_registers(address, words)
            .await
            .map_err(|source| Error::Upload { confirmed, total, source })?;
        confirmed += 1;
        debug!(message = "block confirmed", address, confirmed, total);
    }
    info!(message = "profile stored", blocks = confirmed);
    wait_until_online(connection).await?;
    Ok(confirmed)
}

/// Polls the download status register once a second until the controller
/// reports itself online.
async fn wait_until_online(connection: &Connection) -> Result<(), Error> {
    for attempt in 1..=READINESS_ATTEMPTS {
        match connection.read_register(registers::DOWNLOAD_STATUS_ADDRESS).await {
            Ok(registers::DOWNLOAD_STATUS_ONLINE) => return Ok(()),
            Ok(word) => debug!(message = "controller is offline", word, attempt),
            // The controller may not answer at all while it ingests a
            // profile; treat that the same as an offline report.
            Err(error) => {
                debug!(message = "readiness poll failed", error = &error as &dyn std::error::Error, attempt);
            }
        }
        tokio::time::sleep(READINESS_INTERVAL).await;
    }
    Err(Error::NeverOnline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::crc;
    use clap::Parser as _;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _, DuplexStream};

    fn header(steps: i16) -> Record {
        let mut words = [0i16; WORDS_PER_RECORD];
        words[STEP_COUNT_FIELD] = steps;
        Record(words)
    }

    fn step(setpoint: i16) -> Record {
        let mut words = [0i16; WORDS_PER_RECORD];
        words[0] = setpoint;
        Record(words)
    }

    #[test]
    fn file_field_scaling() {
        assert_eq!(parse_field("300"), Some(300));
        assert_eq!(parse_field("-40"), Some(-40));
        assert_eq!(parse_field("30.0"), Some(300));
        assert_eq!(parse_field("-2.57"), Some(-25));
        assert_eq!(parse_field("0.09"), Some(0));
        assert_eq!(parse_field("4000.0"), None);
        assert_eq!(parse_field("garden"), None);
    }

    #[test]
    fn parse_counts_and_addresses() {
        let text = "\
            0,0,0,0,0,0,0,0,0,2,0,0,0,0,0\n\
            1,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n\
            2,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n";
        let profile = Profile::parse(text).unwrap();
        assert_eq!(profile.step_count(), 2);
        let addresses: Vec<u16> = profile.blocks().map(|(a, _)| a).collect();
        assert_eq!(addresses, [200, 215, 230]);
    }

    #[test]
    fn parse_ignores_surplus_rows_and_fields() {
        // Declares one step; the second step row and the 16th field are
        // both ignored.
        let text = "\
            0,0,0,0,0,0,0,0,0,1,0,0,0,0,0\n\
            \n\
            1,0,0,0,0,0,0,0,0,0,0,0,0,0,7,999\n\
            2,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n";
        let profile = Profile::parse(text).unwrap();
        assert_eq!(profile.step_count(), 1);
        let (_, words) = profile.blocks().nth(1).unwrap();
        assert_eq!(words[14], 7);
    }

    #[test]
    fn parse_rejects_malformed_files() {
        assert!(matches!(Profile::parse(""), Err(Error::Empty)));
        assert!(matches!(
            Profile::parse("1,2,3\n"),
            Err(Error::ShortRow { row: 1, found: 3 })
        ));
        assert!(matches!(
            Profile::parse("0,x,0,0,0,0,0,0,0,0,0,0,0,0,0\n"),
            Err(Error::BadField { row: 1, field: 2, .. })
        ));
        // Declared two steps, provided one.
        let text = "\
            0,0,0,0,0,0,0,0,0,2,0,0,0,0,0\n\
            1,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n";
        assert!(matches!(
            Profile::parse(text),
            Err(Error::MissingSteps { declared: 2, found: 1 })
        ));
        assert!(matches!(
            Profile::new(header(120), vec![]),
            Err(Error::TooManySteps { declared: 120 })
        ));
    }

    #[test]
    fn profile_name_comes_from_the_header() {
        let mut words = [0i16; WORDS_PER_RECORD];
        for (word, chunk) in std::iter::zip(&mut words[4..9], b"COLDSOAK  ".chunks(2)) {
            *word = i16::from_be_bytes([chunk[0], chunk[1]]);
        }
        let profile = Profile::new(Record(words), vec![]).unwrap();
        assert_eq!(profile.name(), "COLDSOAK");
    }

    async fn read_request(remote: &mut DuplexStream) -> Option<Vec<u8>> {
        let mut head = [0u8; 8];
        remote.read_exact(&mut head).await.ok()?;
        let mut frame = head.to_vec();
        if head[1] == 0x10 {
            // The rest of the data section plus the checksum trailer.
            let mut rest = vec![0u8; usize::from(head[6]) + 1];
            remote.read_exact(&mut rest).await.ok()?;
            frame.extend(rest);
        }
        Some(frame)
    }

    /// A scripted controller: answers status reads with `online_word` and
    /// block writes with the standard echo, recording each block address.
    fn chamber(mut remote: DuplexStream, online_word: u16, blocks: Arc<Mutex<Vec<u16>>>) {
        tokio::task::spawn(async move {
            while let Some(frame) = read_request(&mut remote).await {
                let mut reply = match frame[1] {
                    0x03 => {
                        let mut reply = vec![frame[0], 0x03, 0x02];
                        reply.extend(online_word.to_be_bytes());
                        reply
                    }
                    0x10 => {
                        let address = u16::from_be_bytes([frame[2], frame[3]]);
                        blocks.lock().unwrap().push(address);
                        frame[..6].to_vec()
                    }
                    _ => continue,
                };
                crc::append(&mut reply);
                if remote.write_all(&reply).await.is_err() {
                    return;
                }
            }
        });
    }

    fn test_connection(remote_online_word: u16, blocks: &Arc<Mutex<Vec<u16>>>) -> Connection {
        let (local, remote) = tokio::io::duplex(1024);
        chamber(remote, remote_online_word, Arc::clone(blocks));
        let args = crate::connection::Args::parse_from(["test", "--dummy"]);
        Connection::with_transport(local, &args)
    }

    #[tokio::test(start_paused = true)]
    async fn upload_sends_header_and_each_step() {
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let connection = test_connection(0, &blocks);
        let profile = Profile::new(header(3), vec![step(1), step(2), step(3)]).unwrap();
        let confirmed = upload(&connection, &profile).await.unwrap();
        assert_eq!(confirmed, 4);
        assert_eq!(*blocks.lock().unwrap(), [200, 215, 230, 245]);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_refuses_an_offline_controller() {
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let connection = test_connection(1, &blocks);
        let profile = Profile::new(header(1), vec![step(1)]).unwrap();
        let result = upload(&connection, &profile).await;
        assert!(matches!(result, Err(Error::NeverOnline)), "{result:?}");
        assert!(blocks.lock().unwrap().is_empty(), "no block may be transmitted");
    }
}
