//! Scripted portal double and page fixtures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rostersync_fetch::{PortalRequest, PortalResponse, PortalTransport, TransportError};

use crate::parser::EXPECTED_COLUMNS;

pub const BASE_URL: &str = "https://members.example.org/";

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<PortalResponse, TransportError>>,
    requests: Vec<PortalRequest>,
}

/// Replays canned responses in order and records every request.
///
/// Clones share one script.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: PortalResponse) -> Self {
        self.script.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    pub fn fail(self, status: u16) -> Self {
        self.script
            .lock()
            .unwrap()
            .responses
            .push_back(Err(TransportError::Status {
                status,
                url: "scripted".to_string(),
            }));
        self
    }

    pub fn requests(&self) -> Vec<PortalRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().responses.len()
    }
}

#[async_trait]
impl PortalTransport for ScriptedTransport {
    async fn send(&self, request: PortalRequest) -> Result<PortalResponse, TransportError> {
        let mut script = self.script.lock().unwrap();
        let url = request.url.clone();
        script.requests.push(request);
        script
            .responses
            .pop_front()
            .unwrap_or(Err(TransportError::Status { status: 599, url }))
    }
}

/// A page carrying all three tokens, suffixed with `n`.
pub fn token_page(n: u32, content: &str) -> PortalResponse {
    PortalResponse::ok(format!(
        r#"<html><body><form method="post" id="form1">
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="VS/{n}+=" />
<input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="GEN{n}" />
<input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="EV{n}==" />
{content}
</form></body></html>"#
    ))
}

/// One export row with the given id, first and last name.
pub fn row(id: &str, first: &str, last: &str) -> String {
    let mut cells = vec![String::new(); EXPECTED_COLUMNS];
    cells[0] = format!(r#"<a href="editmember.aspx?id={id}">{id}</a>"#);
    cells[1] = "Individual".to_string();
    cells[2] = first.to_string();
    cells[3] = last.to_string();
    cells[19] = "Active".to_string();
    cells[21] = "06/30/2027".to_string();
    row_from_cells(&cells)
}

pub fn row_from_cells(cells: &[String]) -> String {
    let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
    format!("<tr>{tds}</tr>")
}

/// A results grid with a header row and the given data rows.
pub fn results_table(rows: &[String]) -> String {
    format!(
        r#"<table id="ctl00_MainContent_gvResults"><tr><th>Id</th><th>Type</th></tr>{}</table>"#,
        rows.concat()
    )
}
