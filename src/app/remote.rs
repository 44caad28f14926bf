use anyhow::bail;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::channels::{ChannelQuery, ChannelsResponse};
use crate::search::SearchResponse;
use crate::topics::TopicsResponse;

use super::backend::*;
use super::errors::AppError;

/// Thin REST client for a running `rewatch` daemon. Speaks exactly the same
/// five endpoints the web UI does.
pub struct AppRemote {
    remote_addr: String,
    basic_auth: Option<(String, Option<String>)>,
}

impl AppRemote {
    pub fn new(addr: &str, basic_auth: Option<(String, Option<String>)>) -> AppRemote {
        let remote_addr = addr.strip_suffix('/').unwrap_or(addr).to_string();

        AppRemote {
            remote_addr,
            basic_auth,
        }
    }

    fn get(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        log::debug!("GET {}{}", self.remote_addr, path);
        let url = format!("{}{}", self.remote_addr, path);

        match self.basic_auth.clone() {
            Some((username, password)) => reqwest::blocking::Client::new()
                .get(&url)
                .basic_auth(username, password),
            None => reqwest::blocking::Client::new().get(&url),
        }
    }

    fn post(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        log::debug!("POST {}{}", self.remote_addr, path);
        let url = format!("{}{}", self.remote_addr, path);

        match self.basic_auth.clone() {
            Some((username, password)) => reqwest::blocking::Client::new()
                .post(&url)
                .basic_auth(username, password),
            None => reqwest::blocking::Client::new().post(&url),
        }
    }
}

/// The daemon answers either the payload or `{"error": "..."}`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum WebResponse<T> {
    Error { error: String },
    Data(T),
}

pub fn handle_response<T>(response: reqwest::blocking::Response) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let text = response.text()?;

    let web_response = serde_json::from_str::<WebResponse<T>>(&text).map_err(|err| {
        log::error!("{err}. tried to parse: {text:?}");
        err
    })?;

    match web_response {
        WebResponse::Data(data) => Ok(data),
        WebResponse::Error { error } => {
            bail!(error)
        }
    }
}

impl Backend for AppRemote {
    fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, AppError> {
        let resp = self
            .post("/search")
            .json(&json!({
                "query": query,
                "num_results": num_results,
            }))
            .send()?;

        Ok(handle_response(resp)?)
    }

    fn channels(&self, query: ChannelQuery) -> Result<ChannelsResponse, AppError> {
        let mut params: Vec<(&str, String)> = vec![
            ("sort", query.sort.as_str().to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(q) = &query.q {
            params.push(("q", q.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let resp = self.get("/channels").query(&params).send()?;
        Ok(handle_response(resp)?)
    }

    fn channel_videos(&self, channel: &str) -> Result<ChannelVideosResponse, AppError> {
        let resp = self
            .get("/channel_videos")
            .query(&[("channel", channel)])
            .send()?;
        Ok(handle_response(resp)?)
    }

    fn topics(&self) -> Result<TopicsResponse, AppError> {
        let resp = self.get("/topics").send()?;
        Ok(handle_response(resp)?)
    }

    fn app_config(&self) -> Result<AppConfigResponse, AppError> {
        let resp = self.get("/app-config").send()?;
        Ok(handle_response(resp)?)
    }

    fn health(&self) -> Result<HealthResponse, AppError> {
        let resp = self.get("/healthcheck").send()?;
        Ok(handle_response(resp)?)
    }
}
