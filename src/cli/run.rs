use std::io::{self, BufRead, Write};
use tracing::{debug, error, info, trace, warn};

use crate::cve::{CveRecord, Location, Source};
use crate::error::CvecatError;
use crate::settings::Settings;
use crate::template::{RenderContext, Template};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Counts of what happened to each non-blank input line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub rendered: usize,
    /// Dry runs and empty bodies.
    pub skipped: usize,
    pub failed: usize,
}

/// Processes identifiers one at a time: resolve, fetch, decode, render.
pub struct Runner<S> {
    source: S,
    settings: Settings,
    template: Result<Template, String>,
}

impl<S: Source> Runner<S> {
    pub fn new(source: S, settings: Settings) -> Self {
        // A bad template is reported against every identifier rather than
        // failing the whole run.
        let template = Template::compile(&settings.format).map_err(|e| match e {
            CvecatError::TemplateCompile(reason) => reason,
            other => other.to_string(),
        });

        Self {
            source,
            settings,
            template,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one identifier through the pipeline. `Ok(None)` means there was
    /// nothing to render: a dry run, or an empty body.
    pub fn process(&self, raw: &str) -> crate::Result<Option<String>> {
        let location = Location::resolve(raw, &self.settings.base_url)?;
        if self.settings.verbose > 1 {
            info!("{}", location);
        }
        if self.settings.dryrun {
            return Ok(None);
        }

        let body = self.source.read(&location)?;
        if body.is_empty() {
            return Ok(None);
        }
        if self.settings.verbose > 2 {
            debug!("{}", String::from_utf8_lossy(&body));
        }

        let record = CveRecord::from_slice(&body)?;
        if self.settings.verbose > 3 {
            trace!("{:#?}", record);
        }
        record.validate()?;

        let template = self
            .template
            .as_ref()
            .map_err(|reason| CvecatError::TemplateCompile(reason.clone()))?;
        let url = location.to_string();
        let context = RenderContext {
            url: &url,
            version: VERSION,
            cve: &record,
        };
        template.render(&context).map(Some)
    }

    /// Processes every line, writing rendered output to `out` as soon as it
    /// is produced. Failures are logged and never stop the batch.
    pub fn run<I, W>(&self, lines: I, out: &mut W) -> RunSummary
    where
        I: IntoIterator<Item = io::Result<String>>,
        W: Write,
    {
        let mut summary = RunSummary::default();

        for line in lines {
            let line = match line {
                Ok(line) => line,
                // An undecodable line is one bad identifier, not the end of input.
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    summary.failed += 1;
                    if self.settings.verbose > 0 {
                        warn!("{}: format is CVE-<YYYY>-<NNNN...>", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("{}", e);
                    break;
                }
            };
            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }

            match self.process(raw) {
                Ok(Some(output)) => match out.write_all(output.as_bytes()).and_then(|_| out.flush()) {
                    Ok(()) => summary.rendered += 1,
                    Err(e) => {
                        error!("{}: {}", raw, e);
                        summary.failed += 1;
                    }
                },
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    self.report(raw, e);
                }
            }
        }

        debug!(
            "Rendered {}, skipped {}, failed {}",
            summary.rendered, summary.skipped, summary.failed
        );
        summary
    }

    fn report(&self, raw: &str, e: CvecatError) {
        match e {
            e if e.is_identifier_error() => {
                if self.settings.verbose > 0 {
                    warn!("{}: {}: format is CVE-<YYYY>-<NNNN...>", raw, e);
                }
            }
            CvecatError::TemplateExec { reason, partial } => {
                error!("{}: template: {}", raw, reason);
                if !partial.is_empty() {
                    debug!("{}: partial output: {}", raw, partial);
                }
            }
            e => error!("{}: {}", raw, e),
        }
    }
}

/// Lines of standard input, read one at a time so a later `-` identifier
/// can consume the rest of the stream as a record body.
pub struct StdinLines;

impl Iterator for StdinLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        match io::stdin().lock().read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(String::from_utf8_lossy(&line).into_owned())),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Identifiers given as arguments, treated exactly like input lines.
pub fn argument_lines(cve: &[String]) -> impl Iterator<Item = io::Result<String>> {
    cve.join("\n")
        .lines()
        .map(|line| Ok(line.to_string()))
        .collect::<Vec<_>>()
        .into_iter()
}
