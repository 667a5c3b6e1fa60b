use reqwest::blocking::Client;
use std::io::Read;

use crate::cve::Location;
use crate::error::CvecatError;

/// Longest response body kept in a [`CvecatError::RemoteStatus`] error.
const MAX_ERROR_BODY: usize = 512;

/// Something that can produce the raw bytes of a CVE record.
pub trait Source {
    fn read(&self, location: &Location) -> crate::Result<Vec<u8>>;
}

/// Reads records over HTTP, or from standard input for [`Location::Stdin`].
pub struct CveFetcher {
    client: Client,
}

impl CveFetcher {
    pub fn new() -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cvecat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn fetch(&self, url: &str) -> crate::Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.bytes()?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(CvecatError::RemoteStatus {
                status: status.as_u16(),
                body: error_excerpt(&body),
            })
        }
    }
}

impl Source for CveFetcher {
    fn read(&self, location: &Location) -> crate::Result<Vec<u8>> {
        match location {
            Location::Stdin => {
                let mut body = Vec::new();
                std::io::stdin().read_to_end(&mut body)?;
                Ok(body)
            }
            Location::Remote(url) => self.fetch(url),
        }
    }
}

fn error_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
