use anyhow::{anyhow, Result};
use clap::Parser;
use lazy_static::lazy_static;
use rag_core::extract::html_to_text;
use regex::Regex;
use reqwest::{header, Client, Url};
use sha1::{Digest, Sha1};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref SPACES: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref UNSAFE: Regex = Regex::new(r"[^a-zA-Z0-9 _.,()]+").expect("valid regex");
}

const DEFAULT_SEEDS: &[(&str, &str)] = &[
    ("INA", "https://www.uscis.gov/laws-and-policy/legislation/immigration-and-nationality-act"),
    ("USCIS Policy Manual Export", "https://www.uscis.gov/book/export/html/68600"),
    ("FAM 9 Visas TOC", "https://fam.state.gov/Volumes/Details/09FAM"),
    ("EOIR AG and BIA Decisions Index", "https://www.justice.gov/eoir/ag-bia-decisions"),
    ("eCFR Title 8 XML GovInfo", "https://www.govinfo.gov/bulkdata/ECFR/title-8/ECFR-title8.xml"),
];

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Fetch seed immigration-law documents into the corpus directory")]
struct Cli {
    /// Corpus directory to populate
    #[arg(long, default_value = "./corpus")]
    corpus: PathBuf,
    /// File with seeds, one per line: `label<TAB>url` or a bare url. Built-in seeds when absent.
    #[arg(long)]
    seeds: Option<PathBuf>,
    /// Request timeout seconds
    #[arg(long, default_value_t = 40)]
    timeout_secs: u64,
    /// User-Agent string
    #[arg(long, default_value = "Mozilla/5.0")]
    user_agent: String,
    /// Fetch even when the corpus already holds files
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Seed {
    label: String,
    url: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Html,
    Xml,
    Pdf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    fs::create_dir_all(&args.corpus)?;

    if !args.force && has_files(&args.corpus)? {
        tracing::info!(corpus = %args.corpus.display(), "corpus already populated, skipping bootstrap");
        return Ok(());
    }

    let seeds = match &args.seeds {
        Some(path) => load_seeds(BufReader::new(File::open(path)?))?,
        None => default_seeds(),
    };
    if seeds.is_empty() { return Err(anyhow!("no valid seeds")); }

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let (saved, failed) = bootstrap(&client, seeds, &args.corpus).await;
    tracing::info!(saved, failed, corpus = %args.corpus.display(), "bootstrap done");
    Ok(())
}

/// Fetch every seed concurrently into `corpus`. A seed that fails is logged and
/// counted, never fatal. Returns `(saved, failed)`.
async fn bootstrap(client: &Client, seeds: Vec<Seed>, corpus: &Path) -> (usize, usize) {
    let handles: Vec<_> = seeds
        .into_iter()
        .map(|seed| {
            let client = client.clone();
            let corpus = corpus.to_path_buf();
            tokio::spawn(async move {
                let outcome = fetch_seed(&client, &seed, &corpus).await;
                (seed, outcome)
            })
        })
        .collect();

    let mut saved = 0usize;
    let mut failed = 0usize;
    for h in handles {
        match h.await {
            Ok((seed, Ok(path))) => {
                saved += 1;
                tracing::info!(label = %seed.label, path = %path.display(), "saved");
            }
            Ok((seed, Err(e))) => {
                failed += 1;
                tracing::warn!(label = %seed.label, url = %seed.url, error = %e, "fetch failed, skipping");
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(error = %e, "fetch task aborted");
            }
        }
    }
    (saved, failed)
}

async fn fetch_seed(client: &Client, seed: &Seed, corpus: &Path) -> Result<PathBuf> {
    let resp = client
        .get(seed.url.clone())
        .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .send()
        .await?
        .error_for_status()?;
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let bytes = resp.bytes().await?;
    let header_line = format!("SOURCE: {}\n\n", seed.url);

    let (path, contents) = match classify(&seed.url, &content_type) {
        Payload::Pdf => (corpus.join(format!("{}.pdf", file_stem(seed, None))), bytes.to_vec()),
        Payload::Xml => {
            let xml = String::from_utf8_lossy(&bytes);
            (corpus.join(format!("{}.xml", file_stem(seed, None))), format!("{}{}", header_line, xml).into_bytes())
        }
        Payload::Html => {
            let page = html_to_text(&String::from_utf8_lossy(&bytes));
            let stem = file_stem(seed, page.title.as_deref());
            (corpus.join(format!("{}.txt", stem)), format!("{}{}", header_line, page.text).into_bytes())
        }
    };
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

fn classify(url: &Url, content_type: &str) -> Payload {
    let ct = content_type.to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();
    if ct.starts_with("application/pdf") || path.ends_with(".pdf") {
        Payload::Pdf
    } else if path.ends_with(".xml") || (ct.contains("xml") && !ct.contains("xhtml")) {
        Payload::Xml
    } else {
        Payload::Html
    }
}

/// Filesystem-safe file stem: collapsed whitespace, restricted charset, at most 120 chars.
fn safe_name(s: &str) -> String {
    let collapsed = SPACES.replace_all(s, " ");
    let cleaned = UNSAFE.replace_all(collapsed.trim(), "");
    let truncated: String = cleaned.chars().take(120).collect();
    let name = truncated.trim();
    if name.is_empty() { "doc".to_string() } else { name.to_string() }
}

/// `safe_name` of the label (and page title) plus a short URL hash, so seeds that
/// share a label or lack a title still land in distinct files.
fn file_stem(seed: &Seed, title: Option<&str>) -> String {
    let readable = match title {
        Some(t) => safe_name(&format!("{} {}", seed.label, t)),
        None => safe_name(&seed.label),
    };
    let digest = Sha1::digest(seed.url.as_str().as_bytes());
    let short: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", readable, short)
}

fn default_seeds() -> Vec<Seed> {
    DEFAULT_SEEDS
        .iter()
        .filter_map(|(label, url)| Url::parse(url).ok().map(|url| Seed { label: label.to_string(), url }))
        .collect()
}

fn load_seeds<R: BufRead>(reader: R) -> Result<Vec<Seed>> {
    let mut seeds = Vec::new();
    for line in reader.lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') { continue; }
        let (label, raw) = match s.split_once('\t') {
            Some((l, u)) => (Some(l.trim().to_string()), u.trim().to_string()),
            None => (None, s.clone()),
        };
        let url = Url::parse(&raw).or_else(|_| Url::parse(&format!("https://{}", raw)));
        match url {
            Ok(u) => {
                let label = label.unwrap_or_else(|| u.host_str().unwrap_or("doc").to_string());
                seeds.push(Seed { label, url: u });
            }
            Err(e) => tracing::warn!(line = %s, error = %e, "ignoring bad seed"),
        }
    }
    Ok(seeds)
}

fn has_files(dir: &Path) -> Result<bool> {
    for entry in fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() { return Ok(true); }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_strips_and_truncates() {
        assert_eq!(safe_name("  INA   Title: §212/a  "), "INA Title 212a");
        assert_eq!(safe_name("///"), "doc");
        assert_eq!(safe_name(&"a".repeat(300)).len(), 120);
    }

    #[test]
    fn seeds_file_accepts_labels_bare_urls_and_comments() {
        let input = "# starter corpus\nINA\thttps://www.uscis.gov/ina\n\nfam.state.gov/Volumes\nnot a url at all\n";
        let seeds = load_seeds(input.as_bytes()).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].label, "INA");
        assert_eq!(seeds[1].label, "fam.state.gov");
        assert_eq!(seeds[1].url.as_str(), "https://fam.state.gov/Volumes");
    }

    #[test]
    fn default_seeds_all_parse() {
        assert_eq!(default_seeds().len(), DEFAULT_SEEDS.len());
    }

    #[test]
    fn payload_kind_from_url_and_content_type() {
        let xml = Url::parse("https://www.govinfo.gov/bulkdata/ECFR/title-8/ECFR-title8.xml").unwrap();
        let page = Url::parse("https://www.uscis.gov/book/export/html/68600").unwrap();
        assert_eq!(classify(&xml, "text/html"), Payload::Xml);
        assert_eq!(classify(&page, "text/html; charset=utf-8"), Payload::Html);
        assert_eq!(classify(&page, "application/xhtml+xml"), Payload::Html);
        assert_eq!(classify(&page, "application/pdf"), Payload::Pdf);
    }

    #[test]
    fn same_host_seeds_get_distinct_files() {
        let seeds = load_seeds("www.govinfo.gov/bulkdata/a.xml\nwww.govinfo.gov/bulkdata/b.xml\n".as_bytes()).unwrap();
        assert_eq!(seeds[0].label, seeds[1].label);
        let a = file_stem(&seeds[0], None);
        let b = file_stem(&seeds[1], None);
        assert_ne!(a, b);
        assert!(a.starts_with("www.govinfo.gov-"));
        assert_eq!(a, file_stem(&seeds[0], None));
        assert_ne!(file_stem(&seeds[0], Some("")), file_stem(&seeds[1], Some("")));
        assert!(file_stem(&seeds[0], Some("Title 8")).starts_with("www.govinfo.gov Title 8-"));
    }

    #[tokio::test]
    async fn unreachable_seed_is_counted_not_fatal() {
        let corpus = tempfile::tempdir().unwrap();
        let client = Client::builder().timeout(Duration::from_secs(2)).build().unwrap();
        let seeds = vec![Seed { label: "dead".into(), url: Url::parse("http://127.0.0.1:1/").unwrap() }];
        let (saved, failed) = bootstrap(&client, seeds, corpus.path()).await;
        assert_eq!((saved, failed), (0, 1));
        assert!(!has_files(corpus.path()).unwrap());
    }

    #[test]
    fn existing_files_block_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_files(dir.path()).unwrap());
        fs::create_dir(dir.path().join("sub")).unwrap();
        assert!(!has_files(dir.path()).unwrap());
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        assert!(has_files(dir.path()).unwrap());
    }
}
