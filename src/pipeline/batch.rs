//! Multi-document processing with per-document failure isolation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::model::{OutlineResult, PageContent};
use crate::parser::{InMemoryPages, PageSource, ParseOptions, PdfParser};

use super::Outliner;

/// A document that can be opened for page decoding.
pub trait DocumentInput: Sync {
    /// Identity used in reports and logs.
    fn id(&self) -> String;

    fn open(&self, options: &ParseOptions) -> Result<Box<dyn PageSource + '_>>;
}

impl DocumentInput for PathBuf {
    fn id(&self) -> String {
        self.display().to_string()
    }

    fn open(&self, options: &ParseOptions) -> Result<Box<dyn PageSource + '_>> {
        self.as_path().open(options)
    }
}

impl DocumentInput for Path {
    fn id(&self) -> String {
        self.display().to_string()
    }

    fn open(&self, options: &ParseOptions) -> Result<Box<dyn PageSource + '_>> {
        Ok(Box::new(PdfParser::open_with_options(self, options.clone())?))
    }
}

/// Already decoded pages under a name.
#[derive(Debug, Clone)]
pub struct NamedPages {
    pub name: String,
    pub pages: InMemoryPages,
}

impl NamedPages {
    pub fn new(name: impl Into<String>, pages: Vec<PageContent>) -> Self {
        Self {
            name: name.into(),
            pages: InMemoryPages::new(pages),
        }
    }
}

impl DocumentInput for NamedPages {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn open(&self, _options: &ParseOptions) -> Result<Box<dyn PageSource + '_>> {
        Ok(Box::new(&self.pages))
    }
}

/// A successfully processed document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutline {
    pub id: String,
    pub result: OutlineResult,
}

/// A document that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

/// Successes and failures of a batch, each in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<DocumentOutline>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Outline of a successfully processed document.
    pub fn get(&self, id: &str) -> Option<&OutlineResult> {
        self.succeeded
            .iter()
            .find(|d| d.id == id)
            .map(|d| &d.result)
    }
}

impl Outliner {
    /// Open and process one batch input.
    pub fn process_input<I: DocumentInput + ?Sized>(&self, input: &I) -> Result<OutlineResult> {
        let source = input.open(&self.options().parse)?;
        self.process(&*source)
    }

    /// Process many documents; one failure never stops the others.
    pub fn process_batch<I: DocumentInput>(&self, inputs: &[I]) -> BatchReport {
        self.process_batch_with_progress(inputs, |_, _| {})
    }

    /// [`process_batch`](Self::process_batch), calling `on_done(id, ok)` as
    /// each document finishes.
    pub fn process_batch_with_progress<I, F>(&self, inputs: &[I], on_done: F) -> BatchReport
    where
        I: DocumentInput,
        F: Fn(&str, bool) + Sync,
    {
        let run = |input: &I| {
            let id = input.id();
            let outcome = self.process_isolated(input);
            on_done(&id, outcome.is_ok());
            (id, outcome)
        };

        let outcomes: Vec<(String, std::result::Result<OutlineResult, String>)> =
            if self.options().parallel_batch {
                inputs.par_iter().map(run).collect()
            } else {
                inputs.iter().map(run).collect()
            };

        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(result) => report.succeeded.push(DocumentOutline { id, result }),
                Err(error) => {
                    log::error!("Failed to process {}: {}", id, error);
                    report.failed.push(BatchFailure { id, error });
                }
            }
        }
        log::info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }

    /// Run one document, turning errors and panics into a message.
    fn process_isolated<I: DocumentInput>(
        &self,
        input: &I,
    ) -> std::result::Result<OutlineResult, String> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.process_input(input))) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
