use anyhow::{anyhow, Context};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::thread::sleep;
use std::time::Duration;
use textindex_core::{ExtractError, Extraction, Extractor};

pub const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Text detection through the Cloud Vision `images:annotate` endpoint.
pub struct VisionExtractor {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
    retries: u32,
    backoff: Duration,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(rename = "textAnnotations")]
    text_annotations: Option<Vec<TextAnnotation>>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VisionExtractor {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.unwrap_or_else(|| VISION_ENDPOINT.to_string()),
            api_key,
            max_results: 6,
            retries: 3,
            backoff: Duration::from_millis(250),
        })
    }

    fn annotate(&self, bytes: &[u8]) -> anyhow::Result<AnnotateResponse> {
        let body = json!({
            "requests": [{
                "image": { "content": base64::engine::general_purpose::STANDARD.encode(bytes) },
                "features": [{ "type": "TEXT_DETECTION", "maxResults": self.max_results }],
            }]
        });

        with_retries(self.retries, self.backoff, || {
            let sent = self
                .client
                .post(&self.endpoint)
                .query(&[("key", &self.api_key)])
                .json(&body)
                .send();
            classify(sent)
        })
    }
}

/// What to do with one annotate attempt.
enum Attempt<T> {
    Done(anyhow::Result<T>),
    Retry(anyhow::Error),
}

/// Server errors and transport failures are worth another try; anything
/// else the service said is final.
fn classify(sent: reqwest::Result<reqwest::blocking::Response>) -> Attempt<AnnotateResponse> {
    match sent {
        Ok(resp) if resp.status().is_success() => {
            Attempt::Done(resp.json::<AnnotateResponse>().context("decoding annotate response"))
        }
        Ok(resp) if resp.status().is_server_error() => {
            Attempt::Retry(anyhow!("annotate request failed: {}", resp.status()))
        }
        Ok(resp) => Attempt::Done(Err(anyhow!("annotate request rejected: {}", resp.status()))),
        Err(err) => Attempt::Retry(anyhow::Error::new(err).context("sending annotate request")),
    }
}

/// Run `send` once plus up to `retries` more times while it asks for a
/// retry, doubling the pause after each attempt.
fn with_retries<T>(
    retries: u32,
    mut backoff: Duration,
    mut send: impl FnMut() -> Attempt<T>,
) -> anyhow::Result<T> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match send() {
            Attempt::Done(result) => return result,
            Attempt::Retry(error) => error,
        };
        if attempt > retries {
            return Err(error);
        }
        tracing::debug!(attempt, %error, "retrying annotate request");
        sleep(backoff);
        backoff *= 2;
    }
}

impl Extractor for VisionExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let response = self.annotate(bytes)?;
        parse_response(response).map_err(ExtractError::from)
    }
}

fn parse_response(response: AnnotateResponse) -> anyhow::Result<Extraction> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Extraction::Empty);
    };
    if let Some(status) = first.error {
        return Err(anyhow!("vision error {}: {}", status.code, status.message));
    }
    let annotations = match first.text_annotations {
        Some(a) if !a.is_empty() => a,
        _ => return Ok(Extraction::Empty),
    };
    let mut fragments = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        match annotation.description {
            Some(text) => fragments.push(text),
            None => tracing::warn!("text annotation without description"),
        }
    }
    Ok(Extraction::Fragments(fragments))
}

/// Reads documents that already are UTF-8 text.
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let text = std::str::from_utf8(bytes).map_err(|e| anyhow!("not UTF-8 text: {e}"))?;
        if text.trim().is_empty() {
            Ok(Extraction::Empty)
        } else {
            Ok(Extraction::Fragments(vec![text.to_string()]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    fn parse(raw: &str) -> anyhow::Result<Extraction> {
        parse_response(serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn annotations_become_fragments() {
        let raw = r#"{"responses":[{"textAnnotations":[
            {"description":"STOP\nAHEAD","locale":"en"},
            {"boundingPoly":{}},
            {"description":"STOP"}
        ]}]}"#;
        let got = parse(raw).unwrap();
        assert_eq!(got, Extraction::Fragments(vec!["STOP\nAHEAD".into(), "STOP".into()]));
    }

    #[test]
    fn missing_annotations_mean_no_text() {
        assert_eq!(parse(r#"{"responses":[{}]}"#).unwrap(), Extraction::Empty);
        assert_eq!(parse(r#"{"responses":[]}"#).unwrap(), Extraction::Empty);
    }

    #[test]
    fn response_error_is_a_failure() {
        let raw = r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn text_extractor_handles_blank_and_binary() {
        assert_eq!(TextExtractor.extract(b"  \n").unwrap(), Extraction::Empty);
        assert!(TextExtractor.extract(&[0xff, 0xfe]).is_err());
        assert_eq!(TextExtractor.extract(b"hi").unwrap(), Extraction::Fragments(vec!["hi".into()]));
    }

    #[test]
    fn retries_stop_after_the_limit() {
        let mut calls = 0;
        let result: anyhow::Result<()> = with_retries(3, Duration::ZERO, || {
            calls += 1;
            Attempt::Retry(anyhow!("503"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn final_answers_are_not_retried() {
        let mut calls = 0;
        let result: anyhow::Result<()> = with_retries(3, Duration::ZERO, || {
            calls += 1;
            Attempt::Done(Err(anyhow!("400")))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn success_after_transient_failures() {
        let mut calls = 0;
        let result = with_retries(3, Duration::ZERO, || {
            calls += 1;
            if calls < 3 {
                Attempt::Retry(anyhow!("timeout"))
            } else {
                Attempt::Done(Ok(calls))
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    /// Answers one request per scripted `(status, body)` and returns how
    /// many it served.
    fn serve(script: Vec<(u16, &'static str)>) -> (String, JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/images:annotate", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut served = 0;
            for (status, body) in script {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(&mut stream);
                let mut length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line.trim_end().is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut request = vec![0; length];
                reader.read_exact(&mut request).unwrap();
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
                served += 1;
            }
            served
        });
        (url, handle)
    }

    fn vision(url: String) -> VisionExtractor {
        let mut extractor =
            VisionExtractor::new("test-key".into(), Some(url), Duration::from_secs(5)).unwrap();
        extractor.backoff = Duration::ZERO;
        extractor
    }

    const STOP_SIGN: &str = r#"{"responses":[{"textAnnotations":[{"description":"STOP"}]}]}"#;

    #[test]
    fn server_errors_are_retried_until_success() {
        let (url, server) = serve(vec![(503, "{}"), (500, "{}"), (200, STOP_SIGN)]);
        let got = vision(url).extract(b"png").unwrap();
        assert_eq!(got, Extraction::Fragments(vec!["STOP".into()]));
        assert_eq!(server.join().unwrap(), 3);
    }

    #[test]
    fn server_errors_give_up_after_three_retries() {
        let (url, server) = serve(vec![(503, "{}"); 4]);
        assert!(vision(url).extract(b"png").is_err());
        assert_eq!(server.join().unwrap(), 4);
    }

    #[test]
    fn client_errors_fail_at_once() {
        let (url, server) = serve(vec![(403, r#"{"error":"quota"}"#)]);
        let err = vision(url).extract(b"png").unwrap_err();
        assert!(err.to_string().contains("rejected"), "{err}");
        assert_eq!(server.join().unwrap(), 1);
    }

    #[test]
    fn undecodable_success_is_a_failure() {
        let (url, server) = serve(vec![(200, "not json")]);
        let err = vision(url).extract(b"png").unwrap_err();
        assert!(err.to_string().contains("decoding"), "{err}");
        assert_eq!(server.join().unwrap(), 1);
    }
}
