use std::io::BufRead;

use indexmap::IndexSet;
use indicatif::ProgressBar;
use log::{debug, info, trace};

use crate::error::{Error, Result};

/// Number of descriptive columns every record carries
pub const FIXED_FIELDS_LENGTH: usize = 8;

/// Names the header must start with, in order
pub const FIXED_FIELD_NAMES: [&str; FIXED_FIELDS_LENGTH] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO",
];

/// Optional header column that precedes the individual columns
pub const FORMAT_FIELD_NAME: &str = "FORMAT";

pub const ID_COLUMN: usize = 2;
pub const INFO_COLUMN: usize = 7;

const META_PREFIX: &str = "##";
const HEADER_PREFIX: char = '#';
const DELIMITER: char = '\t';
const PROGRESS_INTERVAL: u64 = 10_000;

/// Returned by a handler after each data row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Column layout declared by the header line, fixed for the rest of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    has_format: bool,
    individuals: IndexSet<String>,
}

impl Header {
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split(DELIMITER).collect();

        if fields.len() < FIXED_FIELDS_LENGTH {
            return Err(Error::MalformedRecord {
                line: line_number,
                reason: format!(
                    "header has {} columns, expected at least {}",
                    fields.len(),
                    FIXED_FIELDS_LENGTH
                ),
            });
        }

        if let Some((found, expected)) = fields
            .iter()
            .zip(FIXED_FIELD_NAMES.iter())
            .find(|(found, expected)| found != expected)
        {
            return Err(Error::MalformedRecord {
                line: line_number,
                reason: format!("expected header column {}, found {}", expected, found),
            });
        }

        let has_format = fields.get(FIXED_FIELDS_LENGTH) == Some(&FORMAT_FIELD_NAME);
        let offset = FIXED_FIELDS_LENGTH + usize::from(has_format);

        let mut individuals = IndexSet::with_capacity(fields.len() - offset);
        for name in &fields[offset..] {
            if !individuals.insert(name.to_string()) {
                return Err(Error::MalformedRecord {
                    line: line_number,
                    reason: format!("individual {} appears more than once in the header", name),
                });
            }
        }

        Ok(Self {
            has_format,
            individuals,
        })
    }

    pub fn has_format(&self) -> bool {
        self.has_format
    }

    /// Individual identifiers, in column order
    pub fn individuals(&self) -> &IndexSet<String> {
        &self.individuals
    }

    pub fn num_individuals(&self) -> usize {
        self.individuals.len()
    }

    /// Index of the first individual column
    pub fn data_offset(&self) -> usize {
        FIXED_FIELDS_LENGTH + usize::from(self.has_format)
    }

    pub fn num_columns(&self) -> usize {
        self.data_offset() + self.individuals.len()
    }

    /// Position of an individual among the individual columns
    pub fn index_of(&self, individual: &str) -> Option<usize> {
        self.individuals.get_index_of(individual)
    }

    /// Positions of every requested individual, in the order requested.
    ///
    /// Fails with [`Error::MissingIndividual`] naming the first one absent
    /// from the header.
    pub fn resolve<'a, I>(&self, requested: I) -> Result<Vec<usize>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        requested
            .into_iter()
            .map(|individual| {
                self.index_of(individual)
                    .ok_or_else(|| Error::MissingIndividual(individual.to_string()))
            })
            .collect()
    }
}

/// One data line split into descriptive, format and individual fields
#[derive(Debug)]
pub struct DataRow<'a> {
    line_number: usize,
    fields: Vec<&'a str>,
    data_offset: usize,
    has_format: bool,
}

impl<'a> DataRow<'a> {
    pub fn parse(line: &'a str, line_number: usize, header: &Header) -> Result<Self> {
        let fields: Vec<&str> = line.split(DELIMITER).collect();

        if fields.len() != header.num_columns() {
            return Err(Error::MalformedRecord {
                line: line_number,
                reason: format!(
                    "found {} columns, header declares {}",
                    fields.len(),
                    header.num_columns()
                ),
            });
        }

        Ok(Self {
            line_number,
            fields,
            data_offset: header.data_offset(),
            has_format: header.has_format(),
        })
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// CHROM, POS, ID, REF, ALT, QUAL, FILTER and INFO
    pub fn fixed_fields(&self) -> &[&'a str] {
        &self.fields[..FIXED_FIELDS_LENGTH]
    }

    pub fn chrom(&self) -> &'a str {
        self.fields[0]
    }

    pub fn position(&self) -> &'a str {
        self.fields[1]
    }

    pub fn id(&self) -> &'a str {
        self.fields[ID_COLUMN]
    }

    pub fn reference(&self) -> &'a str {
        self.fields[3]
    }

    pub fn alternate(&self) -> &'a str {
        self.fields[4]
    }

    pub fn info(&self) -> &'a str {
        self.fields[INFO_COLUMN]
    }

    pub fn format(&self) -> Option<&'a str> {
        self.has_format.then(|| self.fields[FIXED_FIELDS_LENGTH])
    }

    /// Individual fields, in header column order
    pub fn samples(&self) -> &[&'a str] {
        &self.fields[self.data_offset..]
    }

    pub fn sample(&self, idx: usize) -> &'a str {
        self.fields[self.data_offset + idx]
    }
}

/// Callbacks driven by [`Dispatcher::run`]
pub trait RecordHandler {
    /// Runs once before the first line is read
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// A `##` metadata line, without its line terminator
    fn process_meta(&mut self, line: &str) -> Result<()>;

    /// The header line, exactly once and before any data row
    fn process_individuals(&mut self, header: &Header) -> Result<()>;

    /// One data row; returning [`Flow::Stop`] ends consumption
    fn process_data(&mut self, row: &DataRow<'_>) -> Result<Flow>;

    /// Runs once after the last consumed line, whether the stream ended or
    /// the handler stopped early
    fn terminate(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub meta_lines: u64,
    pub data_rows: u64,
    pub stopped_early: bool,
}

/// Streams a record source line by line into a [`RecordHandler`]
pub struct Dispatcher<R> {
    reader: R,
    progress: Option<ProgressBar>,
}

impl<R: BufRead> Dispatcher<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            progress: None,
        }
    }

    /// Report the number of data rows consumed on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run<H: RecordHandler + ?Sized>(mut self, handler: &mut H) -> Result<DispatchSummary> {
        handler.prepare()?;

        let mut summary = DispatchSummary::default();
        let mut header: Option<Header> = None;
        let mut line = String::new();
        let mut line_number = 0;

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            let content = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

            if content.starts_with(META_PREFIX) {
                handler.process_meta(content)?;
                summary.meta_lines += 1;
                continue;
            }

            if content.is_empty() {
                trace!("Skipping blank line {}", line_number);
                continue;
            }

            if content.starts_with(HEADER_PREFIX) {
                if header.is_some() {
                    return Err(Error::MalformedRecord {
                        line: line_number,
                        reason: "second header line".to_string(),
                    });
                }
                let parsed = Header::parse(content, line_number)?;
                info!(
                    "Header declares {} individuals ({} FORMAT column)",
                    parsed.num_individuals(),
                    if parsed.has_format() { "with" } else { "without" }
                );
                handler.process_individuals(&parsed)?;
                header = Some(parsed);
                continue;
            }

            let Some(ref current_header) = header else {
                return Err(Error::MalformedRecord {
                    line: line_number,
                    reason: "data line before the header line".to_string(),
                });
            };

            let row = DataRow::parse(content, line_number, current_header)?;
            summary.data_rows += 1;
            if let Some(ref pb) = self.progress {
                if summary.data_rows % PROGRESS_INTERVAL == 0 {
                    pb.set_position(summary.data_rows);
                }
            }

            if handler.process_data(&row)? == Flow::Stop {
                debug!("Handler stopped consumption after line {}", line_number);
                summary.stopped_early = true;
                break;
            }
        }

        if header.is_none() {
            return Err(Error::MalformedRecord {
                line: line_number,
                reason: "stream ended without a header line".to_string(),
            });
        }

        if let Some(ref pb) = self.progress {
            pb.set_position(summary.data_rows);
        }

        handler.terminate()?;
        Ok(summary)
    }
}
