use cvecat::cli::run::{argument_lines, RunSummary, Runner};
use cvecat::cve::{Location, Source};
use cvecat::settings::Settings;
use cvecat::CvecatError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

const BASE_URL: &str = "http://cves.test";

enum Response {
    Body(&'static str),
    Status(u16, &'static str),
}

#[derive(Default)]
struct FakeSource {
    responses: HashMap<String, Response>,
    requests: RefCell<Vec<String>>,
}

impl FakeSource {
    fn with(mut self, location: &str, response: Response) -> Self {
        self.responses.insert(location.to_string(), response);
        self
    }
}

impl Source for FakeSource {
    fn read(&self, location: &Location) -> cvecat::Result<Vec<u8>> {
        let key = location.to_string();
        self.requests.borrow_mut().push(key.clone());
        match self.responses.get(&key) {
            Some(Response::Body(body)) => Ok(body.as_bytes().to_vec()),
            Some(Response::Status(status, body)) => Err(CvecatError::RemoteStatus {
                status: *status,
                body: body.trim().to_string(),
            }),
            None => Err(CvecatError::RemoteStatus {
                status: 404,
                body: "404: Not Found".to_string(),
            }),
        }
    }
}

fn record(id: &str, description: &str) -> String {
    format!(
        r#"{{
            "dataType": "CVE_RECORD",
            "cveMetadata": {{"cveId": "{}", "state": "PUBLISHED", "datePublished": "2019-05-24T19:51:55.099Z"}},
            "containers": {{"cna": {{
                "descriptions": [{{"lang": "en", "value": "{}"}}],
                "references": [{{"url": "https://a.test"}}, {{"url": "https://b.test"}}]
            }}}}
        }}"#,
        id, description
    )
}

fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

fn settings() -> Settings {
    Settings {
        base_url: BASE_URL.to_string(),
        ..Settings::default()
    }
}

fn run(runner: &Runner<FakeSource>, ids: &[&str]) -> (String, RunSummary) {
    let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();
    let summary = runner.run(argument_lines(&ids), &mut out);
    (String::from_utf8(out).unwrap(), summary)
}

#[test]
fn test_default_format() {
    let source = FakeSource::default().with(
        "http://cves.test/2019/5xxx/CVE-2019-5007.json",
        Response::Body(leak(record("CVE-2019-5007", "A flaw."))),
    );
    let runner = Runner::new(source, settings());

    let (out, summary) = run(&runner, &["cve-2019-5007"]);
    assert_eq!(out, "*CVE-2019-5007*: A flaw.\n");
    assert_eq!(summary.rendered, 1);
}

#[test]
fn test_remote_status_does_not_stop_batch() {
    let source = FakeSource::default()
        .with(
            "http://cves.test/2019/5xxx/CVE-2019-5007.json",
            Response::Status(404, "not found\n"),
        )
        .with(
            "http://cves.test/2020/0xxx/CVE-2020-0001.json",
            Response::Body(leak(record("CVE-2020-0001", "Second."))),
        );
    let runner = Runner::new(source, settings());

    match runner.process("CVE-2019-5007") {
        Err(CvecatError::RemoteStatus { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "not found");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let (out, summary) = run(&runner, &["CVE-2019-5007", "CVE-2020-1"]);
    assert_eq!(out, "*CVE-2020-0001*: Second.\n");
    assert_eq!(
        summary,
        RunSummary {
            rendered: 1,
            skipped: 0,
            failed: 1
        }
    );
}

#[test]
fn test_no_description_produces_no_output() {
    let body = r#"{"cveMetadata": {"cveId": "CVE-2019-5007"}, "containers": {"cna": {"descriptions": []}}}"#;
    let source = FakeSource::default().with(
        "http://cves.test/2019/5xxx/CVE-2019-5007.json",
        Response::Body(body),
    );
    let runner = Runner::new(source, settings());

    assert!(matches!(
        runner.process("CVE-2019-5007"),
        Err(CvecatError::NoDescription)
    ));

    let (out, summary) = run(&runner, &["CVE-2019-5007"]);
    assert!(out.is_empty());
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_invalid_identifiers_never_reach_the_source() {
    let runner = Runner::new(FakeSource::default(), settings());

    let (out, summary) = run(&runner, &["CVE-19-5007", "XXX-2019-5007", "1-2-3-4"]);
    assert!(out.is_empty());
    assert_eq!(summary.failed, 3);
    assert!(runner_requests(&runner).is_empty());
}

#[test]
fn test_dryrun_resolves_without_fetching() {
    let runner = Runner::new(
        FakeSource::default(),
        Settings {
            dryrun: true,
            ..settings()
        },
    );

    let (out, summary) = run(&runner, &["CVE-2019-5007", "-"]);
    assert!(out.is_empty());
    assert_eq!(summary.skipped, 2);
    assert!(runner_requests(&runner).is_empty());
}

#[test]
fn test_blank_lines_are_skipped() {
    let source = FakeSource::default().with(
        "http://cves.test/2019/5xxx/CVE-2019-5007.json",
        Response::Body(leak(record("CVE-2019-5007", "A flaw."))),
    );
    let runner = Runner::new(source, settings());

    let (out, summary) = run(&runner, &["", "  CVE-2019-5007  \n\n", "   "]);
    assert_eq!(out, "*CVE-2019-5007*: A flaw.\n");
    assert_eq!(
        summary,
        RunSummary {
            rendered: 1,
            skipped: 0,
            failed: 0
        }
    );
}

#[test]
fn test_empty_body_renders_nothing() {
    let source = FakeSource::default().with("-", Response::Body(""));
    let runner = Runner::new(source, settings());

    let (out, summary) = run(&runner, &["-"]);
    assert!(out.is_empty());
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_context_fields_and_helpers() {
    let source = FakeSource::default().with(
        "-",
        Response::Body(leak(record("CVE-2019-5007", "Use *after* free."))),
    );
    let format = concat!(
        "{{.cve.cveMetadata.cveId}} from {{.url}} ({{.version}})\n",
        "{{(index .cve.containers.cna.descriptions 0).value | escape}}\n",
        "{{range .cve.containers.cna.references}}- {{.url}}\n{{end}}",
        "{{.cve.cveMetadata.datePublished}}\n",
    );
    let runner = Runner::new(
        source,
        Settings {
            format: format.to_string(),
            ..settings()
        },
    );

    let (out, _) = run(&runner, &["-"]);
    assert_eq!(
        out,
        format!(
            "CVE-2019-5007 from - ({})\nUse \\*after\\* free\\.\n- https://a.test\n- https://b.test\n2019-05-24T19:51:55Z\n",
            env!("CARGO_PKG_VERSION")
        )
    );
}

#[test]
fn test_template_failures_are_per_identifier() {
    let source = FakeSource::default().with(
        "-",
        Response::Body(leak(record("CVE-2019-5007", "A flaw."))),
    );

    let runner = Runner::new(
        source,
        Settings {
            format: "{{.cve.cveMetadata.cveId}} {{.cve.nope}}".to_string(),
            ..settings()
        },
    );
    match runner.process("-") {
        Err(CvecatError::TemplateExec { partial, .. }) => assert_eq!(partial, "CVE-2019-5007 "),
        other => panic!("unexpected result: {:?}", other),
    }

    let source = FakeSource::default().with(
        "-",
        Response::Body(leak(record("CVE-2019-5007", "A flaw."))),
    );
    let runner = Runner::new(
        source,
        Settings {
            format: "{{.cve".to_string(),
            ..settings()
        },
    );
    assert!(matches!(
        runner.process("-"),
        Err(CvecatError::TemplateCompile(_))
    ));
    let (out, summary) = run(&runner, &["-", "-"]);
    assert!(out.is_empty());
    assert_eq!(summary.failed, 2);
}

#[test]
fn test_decode_failure_is_reported() {
    let source = FakeSource::default().with("-", Response::Body(r#"{"containers": "none"}"#));
    let runner = Runner::new(source, settings());

    assert!(matches!(runner.process("-"), Err(CvecatError::Json(_))));
}

#[test]
fn test_undecodable_line_does_not_stop_batch() {
    let source = FakeSource::default()
        .with(
            "http://cves.test/2019/5xxx/CVE-2019-5007.json",
            Response::Body(leak(record("CVE-2019-5007", "First."))),
        )
        .with(
            "http://cves.test/2020/0xxx/CVE-2020-0001.json",
            Response::Body(leak(record("CVE-2020-0001", "Second."))),
        );
    let runner = Runner::new(source, settings());

    let lines = vec![
        Ok("CVE-2019-5007\n".to_string()),
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "stream did not contain valid UTF-8",
        )),
        Ok("CVE-2020-0001\n".to_string()),
    ];
    let mut out = Vec::new();
    let summary = runner.run(lines, &mut out);

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "*CVE-2019-5007*: First.\n*CVE-2020-0001*: Second.\n"
    );
    assert_eq!(
        summary,
        RunSummary {
            rendered: 2,
            skipped: 0,
            failed: 1
        }
    );
}

#[test]
fn test_read_error_ends_input() {
    let runner = Runner::new(
        FakeSource::default(),
        Settings {
            dryrun: true,
            ..settings()
        },
    );

    let lines = vec![
        Ok("CVE-2019-5007".to_string()),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")),
        Ok("CVE-2020-0001".to_string()),
    ];
    let summary = runner.run(lines, &mut Vec::<u8>::new());
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
}

fn runner_requests(runner: &Runner<FakeSource>) -> Vec<String> {
    runner.source().requests.borrow().clone()
}
