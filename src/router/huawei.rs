//! Client for the web UI of Huawei EG8145V5 optical network terminals.
//!
//! The UI has no API, the static DNS table is read from the script embedded
//! in its configuration page and changed through the same form posts the
//! page itself submits.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::host::{DesiredHost, RemoteHostEntry};
use crate::router::{RouterClient, RouterError};

const RAND_COUNT_PATH: &str = "asp/GetRandCount.asp";
const LOGIN_PATH: &str = "login.cgi";
const DNS_PAGE_PATH: &str = "html/bbsp/dnsconfiguration/dnsconfiguration.asp";
const ADD_PATH: &str = "addcfg.cgi";
const SET_PATH: &str = "setcfg.cgi";
const REQUEST_FILE: &str = "html/ipv6/not_find_file.asp";

const DNS_OBJECT: &str = "InternetGatewayDevice.X_HW_DNS.Domain";
const DNS_ENTRY_MARKER: &str = "new stDnsHost(";
const TOKEN_MARKER: &str = "id=\"hwonttoken\"";
// the login page is the only one fetching a fresh random count
const LOGIN_PAGE_MARKER: &str = "GetRandCount";

const PRE_LOGIN_COOKIE: &str = "Cookie=body:Language:english:id=-1";
const SESSION_COOKIE: &str = "sid=";

#[derive(Serialize)]
struct LoginForm<'a> {
    #[serde(rename = "UserName")]
    user_name: &'a str,
    #[serde(rename = "PassWord")]
    password: String,
    #[serde(rename = "Language")]
    language: &'static str,
    #[serde(rename = "x.X_HW_Token")]
    token: &'a str,
}

#[derive(Serialize)]
struct HostForm<'a> {
    #[serde(rename = "x.DomainName")]
    domain: &'a str,
    #[serde(rename = "x.IPAddress")]
    ip: &'a str,
    #[serde(rename = "x.X_HW_Token")]
    token: &'a str,
}

pub struct HuaweiClient {
    http: reqwest::Client,
    cookies: Arc<Jar>,
    base: Url,
    username: String,
    password: String,
}

impl Debug for HuaweiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuaweiClient")
            .field("base", &self.base.as_str())
            .field("username", &self.username)
            .finish()
    }
}

impl HuaweiClient {
    pub fn new(
        base: Url,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, RouterError> {
        let cookies = Arc::new(Jar::default());

        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .build()?;

        Ok(Self {
            http,
            cookies,
            base,
            username: username.into(),
            password: password.into(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, RouterError> {
        self.base
            .join(path)
            .map_err(|err| RouterError::Unexpected(format!("bad router url {path}: {err}")))
    }

    fn has_session(&self) -> bool {
        self.cookies
            .cookies(&self.base)
            .and_then(|header| header.to_str().map(|cookies| cookies.contains(SESSION_COOKIE)).ok())
            .unwrap_or(false)
    }

    async fn dns_page(&self) -> Result<String, RouterError> {
        let page = self
            .http
            .get(self.url(DNS_PAGE_PATH)?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if page.contains(LOGIN_PAGE_MARKER) {
            return Err(RouterError::SessionExpired);
        }

        Ok(page)
    }

    async fn submit(&self, action: &str, object: &str, host: &DesiredHost) -> Result<(), RouterError> {
        let page = self.dns_page().await?;
        let token = parse_token(&page)
            .ok_or_else(|| RouterError::Unexpected("dns page has no form token".to_string()))?;

        let mut url = self.url(action)?;
        url.query_pairs_mut()
            .append_pair("x", object)
            .append_pair("RequestFile", REQUEST_FILE);

        self.http
            .post(url)
            .form(&HostForm {
                domain: &host.domain,
                ip: &host.ip,
                token,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl RouterClient for HuaweiClient {
    #[instrument(err)]
    async fn login(&self) -> Result<(), RouterError> {
        let rand_count = self
            .http
            .post(self.url(RAND_COUNT_PATH)?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let token = rand_count.trim_start_matches('\u{feff}').trim();

        debug!("get login token done");

        self.http
            .post(self.url(LOGIN_PATH)?)
            .header(reqwest::header::COOKIE, PRE_LOGIN_COOKIE)
            .form(&LoginForm {
                user_name: &self.username,
                password: BASE64_STANDARD.encode(&self.password),
                language: "english",
                token,
            })
            .send()
            .await?
            .error_for_status()?;

        if !self.has_session() {
            return Err(RouterError::LoginRejected(self.username.clone()));
        }

        info!(username = %self.username, "router accepted login");

        Ok(())
    }

    #[instrument(err)]
    async fn list_dns_hosts(&self) -> Result<Vec<RemoteHostEntry>, RouterError> {
        let page = self.dns_page().await?;

        let hosts = parse_dns_hosts(&page);

        debug!(count = hosts.len(), "parse dns hosts done");

        Ok(hosts)
    }

    #[instrument(err, skip(host), fields(%host))]
    async fn create_dns_host(&self, host: &DesiredHost) -> Result<(), RouterError> {
        self.submit(ADD_PATH, DNS_OBJECT, host).await
    }

    #[instrument(err, skip(host), fields(%host))]
    async fn update_dns_host(&self, host: &DesiredHost, index: usize) -> Result<(), RouterError> {
        self.submit(SET_PATH, &instance_path(index), host).await
    }
}

/// Extract the table from the page script, which declares one
/// `new stDnsHost("<instance path>","<domain>","<ip>")` per row.
///
/// The index of an entry is its instance number, the last element of the
/// instance path. Deleted rows leave gaps in the numbering.
fn parse_dns_hosts(page: &str) -> Vec<RemoteHostEntry> {
    page.split(DNS_ENTRY_MARKER)
        .skip(1)
        .filter_map(|chunk| {
            let args = chunk.split(')').next()?;
            let mut fields = args.split(',').map(|field| unescape(field.trim().trim_matches('"')));

            let path = fields.next()?;
            let domain = fields.next()?;
            let ip = fields.next()?;

            let index = path
                .strip_prefix(DNS_OBJECT)?
                .strip_prefix('.')?
                .parse()
                .ok()?;

            Some(RemoteHostEntry { domain, ip, index })
        })
        .collect()
}

fn instance_path(index: usize) -> String {
    format!("{DNS_OBJECT}.{index}")
}

fn parse_token(page: &str) -> Option<&str> {
    let (_, rest) = page.split_once(TOKEN_MARKER)?;
    let (_, rest) = rest.split_once("value=\"")?;

    rest.split('"').next().filter(|token| !token.is_empty())
}

/// Undo the `\xNN` escaping the UI applies to every string it embeds.
///
/// Escapes are bytes, multibyte characters span several of them.
fn unescape(value: &str) -> String {
    let raw = value.as_bytes();
    let mut unescaped = Vec::with_capacity(raw.len());
    let mut pos = 0;

    while pos < raw.len() {
        let byte = raw
            .get(pos..pos + 4)
            .filter(|escape| {
                escape.starts_with(b"\\x") && escape[2..].iter().all(u8::is_ascii_hexdigit)
            })
            .and_then(|escape| std::str::from_utf8(&escape[2..]).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());

        match byte {
            Some(byte) => {
                unescaped.push(byte);
                pos += 4;
            }

            None => {
                unescaped.push(raw[pos]);
                pos += 1;
            }
        }
    }

    String::from_utf8_lossy(&unescaped).into_owned()
}
