//! Rendering of command results as a human table, JSON lines or CSV, to the
//! terminal or a file. Commands build rows lazily so that machine formats
//! can serialize richer records than the table shows.

use std::path::PathBuf;

use csv_core::WriteResult;

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Format {
    Table,
    Jsonl,
    Csv,
}

#[derive(clap::Parser)]
#[group(id = "output::Args")]
pub struct Args {
    /// Write the results to this file instead of the standard output.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open the output file at {1:?}")]
    OpenOutputFile(#[source] std::io::Error, PathBuf),
    #[error("could not write to the output file at {1:?}")]
    WriteFile(#[source] std::io::Error, PathBuf),
    #[error("could not write to the terminal")]
    WriteStdout(#[source] std::io::Error),
    #[error("could not serialize a record to JSON")]
    SerializeJson(#[source] serde_json::Error),
}

impl Args {
    pub fn to_output(self) -> Result<Output, Error> {
        let io = match &self.output {
            None => Box::new(std::io::stdout().lock()) as Box<_>,
            Some(path) => Box::new(
                std::fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .map_err(|e| Error::OpenOutputFile(e, path.clone()))?,
            ) as Box<_>,
        };
        let formatter = match &self.format {
            Format::Table => {
                let mut table = comfy_table::Table::new();
                table.set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
                Formatter::Table(table)
            }
            Format::Jsonl => Formatter::Jsonl,
            Format::Csv => Formatter::Csv,
        };
        Ok(Output { args: self, io, formatter })
    }
}

pub struct Output {
    args: Args,
    io: Box<dyn std::io::Write>,
    formatter: Formatter,
}

enum Formatter {
    Csv,
    Table(comfy_table::Table),
    Jsonl,
}

impl Output {
    /// Declares the column names. Must come before any row.
    pub fn headers(&mut self, names: Vec<&'static str>) -> Result<(), Error> {
        match &mut self.formatter {
            Formatter::Csv => self.write_csv_row(&names),
            Formatter::Table(table) => {
                table.set_header(names);
                Ok(())
            }
            Formatter::Jsonl => Ok(()),
        }
    }

    /// Emits one result. The table/CSV cells and the JSONL record are built
    /// only for the format actually in use.
    pub fn result<R: serde::Serialize>(
        &mut self,
        cells: impl FnOnce() -> Vec<String>,
        record: impl FnOnce() -> R,
    ) -> Result<(), Error> {
        match &mut self.formatter {
            Formatter::Csv => {
                let cells = cells();
                self.write_csv_row(&cells)
            }
            Formatter::Table(table) => {
                table.add_row(cells());
                Ok(())
            }
            Formatter::Jsonl => {
                serde_json::to_writer(&mut self.io, &record()).map_err(Error::SerializeJson)?;
                writeln!(self.io).map_err(|e| self.write_error(e))
            }
        }
    }

    fn write_csv_row<V: std::ops::Deref<Target = str>>(&mut self, cells: &[V]) -> Result<(), Error> {
        // Worst case every byte gets escaped, plus the surrounding quotes.
        let longest = cells.iter().map(|v| v.len()).max().unwrap_or(0);
        let mut buffer = vec![0; 2 + 2 * longest];
        let mut writer = csv_core::Writer::new();
        for (index, cell) in cells.iter().enumerate() {
            if index != 0 {
                let (WriteResult::InputEmpty, written) = writer.delimiter(&mut buffer) else {
                    unreachable!("csv delimiter cannot overflow the buffer");
                };
                self.io.write_all(&buffer[..written]).map_err(|e| self.write_error(e))?;
            }
            let (WriteResult::InputEmpty, consumed, written) =
                writer.field(cell.as_bytes(), &mut buffer)
            else {
                unreachable!("csv buffer was sized for the longest cell");
            };
            assert_eq!(consumed, cell.len());
            self.io.write_all(&buffer[..written]).map_err(|e| self.write_error(e))?;
        }
        let (WriteResult::InputEmpty, written) = writer.terminator(&mut buffer) else {
            unreachable!("csv terminator cannot overflow the buffer");
        };
        self.io.write_all(&buffer[..written]).map_err(|e| self.write_error(e))
    }

    fn write_error(&self, e: std::io::Error) -> Error {
        match &self.args.output {
            None => Error::WriteStdout(e),
            Some(p) => Error::WriteFile(e, p.into()),
        }
    }

    /// Flushes the accumulated output. Tables render here in one piece.
    pub fn commit(mut self) -> Result<(), Error> {
        if let Formatter::Table(table) = &self.formatter {
            writeln!(self.io, "{table}").map_err(|e| self.write_error(e))?;
        }
        self.io.flush().map_err(|e| self.write_error(e))
    }
}
