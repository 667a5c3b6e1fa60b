//! A small text template engine in the style of Go's `text/template`.
//!
//! Templates are rendered against any `Serialize` value; field access walks
//! the value's JSON form, so record fields are addressed by their JSON names:
//!
//! ```text
//! *{{.cve.cveMetadata.cveId}}*: {{(index .cve.containers.cna.descriptions 0).value}}
//! ```
//!
//! Besides `if`, `range`, `with` and pipelines, templates can call `index`,
//! `len`, `eq`, `ne`, `not`, `and`, `or` and the helpers `join`, `sub` and
//! `escape`.

mod exec;
mod funcs;
mod parse;

use serde::Serialize;

use crate::cve::CveRecord;
use crate::error::CvecatError;

pub use funcs::markdown_escape;

/// Data a format template is rendered against.
#[derive(Debug, Serialize)]
pub struct RenderContext<'a> {
    pub url: &'a str,
    pub version: &'a str,
    pub cve: &'a CveRecord,
}

#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<parse::Node>,
}

impl Template {
    pub fn compile(source: &str) -> crate::Result<Self> {
        let nodes = parse::parse(source).map_err(CvecatError::TemplateCompile)?;
        Ok(Self { nodes })
    }

    pub fn render<T: Serialize>(&self, data: &T) -> crate::Result<String> {
        let root = serde_json::to_value(data)?;
        let mut exec = exec::Exec::new(&root);
        match exec.walk(&self.nodes, &root) {
            Ok(()) => Ok(exec.into_output()),
            Err(reason) => Err(CvecatError::TemplateExec {
                reason,
                partial: exec.into_output(),
            }),
        }
    }
}
