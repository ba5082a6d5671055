//! Tabular progress output to the screen and to a log file.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    time::Duration,
};

use itertools::Itertools;

use crate::error::Result;

/// A single cell of a progress row
#[derive(Debug, Clone, Copy)]
pub(crate) enum LogValue {
    Count(u64),
    Float(f64),
    Time(Duration),
}

#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Counter,
    Float,
    Time,
}

#[derive(Debug)]
struct Column {
    name: String,
    kind: ColumnKind,
    width: usize,
}

const FLOAT_WIDTH: usize = 9;
const FLOAT_PRECISION: usize = 6;
const TIME_WIDTH: usize = 8;

/// Format a duration as `m:ss.s`.
pub(crate) fn format_time(elapsed: Duration) -> String {
    let tenths = (elapsed.as_secs_f64() * 10.).round() as u64;
    let (minutes, tenths) = (tenths / 600, tenths % 600);
    format!("{}:{:02}.{}", minutes, tenths / 10, tenths % 10)
}

/// Writes rows of progress information to an optional screen stream and an
/// optional file. The header is written before the first row.
///
/// When both sinks are disabled the logger writes nothing at all.
pub(crate) struct ProgressLogger<'a> {
    screen: Option<&'a mut (dyn Write + Send)>,
    file: Option<BufWriter<File>>,
    csv: bool,
    columns: Vec<Column>,
    header_written: bool,
}

impl<'a> ProgressLogger<'a> {
    pub fn new(
        screen: Option<&'a mut (dyn Write + Send)>,
        file: Option<&Path>,
        csv: bool,
    ) -> Result<Self> {
        let file = file
            .map(|path| File::create(path).map(BufWriter::new))
            .transpose()?;
        Ok(Self {
            screen,
            file,
            csv,
            columns: Vec::new(),
            header_written: false,
        })
    }

    /// Whether any sink is enabled.
    pub fn is_active(&self) -> bool {
        self.screen.is_some() || self.file.is_some()
    }

    pub fn add_counter(&mut self, name: &str, max_value: u64) {
        let width = name.len().max(max_value.to_string().len());
        self.add_column(name, ColumnKind::Counter, width);
    }

    pub fn add_float(&mut self, name: &str) {
        self.add_column(name, ColumnKind::Float, name.len().max(FLOAT_WIDTH));
    }

    pub fn add_time(&mut self, name: &str) {
        self.add_column(name, ColumnKind::Time, name.len().max(TIME_WIDTH));
    }

    fn add_column(&mut self, name: &str, kind: ColumnKind, width: usize) {
        assert!(
            !self.header_written,
            "Columns cannot be added after logging started"
        );
        self.columns.push(Column {
            name: name.to_string(),
            kind,
            width,
        });
    }

    /// Write a line of free text to the screen sink only.
    pub fn message(&mut self, text: &str) -> Result<()> {
        if let Some(screen) = self.screen.as_mut() {
            writeln!(screen, "{}", text)?;
        }
        Ok(())
    }

    fn text_header(&self) -> String {
        self.columns
            .iter()
            .map(|col| format!("{:<width$}", col.name, width = col.width))
            .join(" ")
            .trim_end()
            .to_string()
    }

    fn csv_header(&self) -> String {
        self.columns
            .iter()
            .map(|col| format!("\"{}\"", col.name))
            .join(",")
    }

    fn text_row(&self, values: &[LogValue]) -> String {
        self.columns
            .iter()
            .zip(values)
            .map(|(col, value)| {
                let cell = match value {
                    LogValue::Count(n) => n.to_string(),
                    LogValue::Float(x) => format_float(*x),
                    LogValue::Time(t) => format_time(*t),
                };
                format!("{:<width$}", cell, width = col.width)
            })
            .join(" ")
            .trim_end()
            .to_string()
    }

    fn csv_row(values: &[LogValue]) -> String {
        values
            .iter()
            .map(|value| match value {
                LogValue::Count(n) => n.to_string(),
                LogValue::Float(x) => x.to_string(),
                LogValue::Time(t) => t.as_secs_f64().to_string(),
            })
            .join(",")
    }

    /// Write one row, one value per column in the order they were added.
    pub fn log(&mut self, values: &[LogValue]) -> Result<()> {
        assert_eq!(
            values.len(),
            self.columns.len(),
            "Number of logged values must match the number of columns"
        );
        for (col, value) in self.columns.iter().zip(values) {
            debug_assert!(matches!(
                (col.kind, value),
                (ColumnKind::Counter, LogValue::Count(_))
                    | (ColumnKind::Float, LogValue::Float(_))
                    | (ColumnKind::Time, LogValue::Time(_))
            ));
        }
        if !self.is_active() {
            return Ok(());
        }

        let text = self.text_row(values);
        let first = !self.header_written;
        if first {
            let header = self.text_header();
            if let Some(screen) = self.screen.as_mut() {
                writeln!(screen, "{}", header)?;
            }
            let file_header = if self.csv {
                self.csv_header()
            } else {
                header
            };
            if let Some(file) = self.file.as_mut() {
                writeln!(file, "{}", file_header)?;
            }
            self.header_written = true;
        }

        if let Some(screen) = self.screen.as_mut() {
            writeln!(screen, "{}", text)?;
        }
        if self.file.is_some() {
            let row = if self.csv {
                Self::csv_row(values)
            } else {
                text
            };
            if let Some(file) = self.file.as_mut() {
                writeln!(file, "{}", row)?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(screen) = self.screen.as_mut() {
            screen.flush()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

fn format_float(x: f64) -> String {
    if x.is_nan() {
        "NA".to_string()
    } else if x.is_infinite() {
        let text = if x > 0. { "Inf" } else { "-Inf" };
        text.to_string()
    } else {
        format!("{:.prec$}", x, prec = FLOAT_PRECISION)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
