//! In-memory annotation API used by the sync tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use marginalia_core::{
    Annotation, AnnotationBody, AnnotationDraft, AnnotationPatch, Creator, Motivation, ParentRef, Selector, Target,
};
use marginalia_sync::{AnnotationApi, AnnotationQuery, ApiError, ApiResult};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Holds a delete request open until the test releases it
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct MockState {
    records: Vec<Annotation>,
    calls: Vec<String>,
    fail_status: Option<u16>,
    next_id: u64,
}

#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
    delete_gate: Option<Arc<Gate>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Annotation>) -> Self {
        let api = Self::new();
        api.state.lock().unwrap().records = records;
        api
    }

    pub fn with_delete_gate(mut self, gate: Arc<Gate>) -> Self {
        self.delete_gate = Some(gate);
        self
    }

    /// Every later request fails with `status`
    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().fail_status = Some(status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn push_record(&self, record: Annotation) {
        self.state.lock().unwrap().records.push(record);
    }

    fn begin(&self, call: String) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.fail_status {
            Some(status) => Err(ApiError::Status {
                status,
                body: "mock failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AnnotationApi for MockApi {
    async fn list(&self, query: &AnnotationQuery) -> ApiResult<Vec<Annotation>> {
        let mut call = format!("list {} {}", query.motivation, query.document_element_id);
        if let Some(classroom) = &query.classroom_id {
            call.push_str(&format!(" classroom={classroom}"));
        }
        self.begin(call)?;
        let element = ParentRef::element(query.document_element_id.as_str());
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|r| r.targets(&element))
            .cloned()
            .collect())
    }

    async fn create(&self, draft: &AnnotationDraft) -> ApiResult<Annotation> {
        self.begin(format!("create {}", draft.motivation))?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let at = epoch() + Duration::seconds(state.next_id as i64);
        let record = Annotation {
            id: format!("srv-{}", state.next_id),
            creator: creator(),
            motivation: draft.motivation,
            body: draft.body.clone(),
            target: draft.target.clone(),
            created: at,
            modified: at,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn patch(&self, id: &str, patch: &AnnotationPatch) -> ApiResult<Annotation> {
        self.begin(format!("patch {id}"))?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(not_found)?;
        if let Some(body) = &patch.body {
            record.body = body.clone();
        }
        record.modified = record.modified + Duration::minutes(1);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        self.begin(format!("delete {id}"))?;
        if let Some(gate) = &self.delete_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let mut state = self.state.lock().unwrap();
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: "no such annotation".to_string(),
    }
}

pub fn epoch() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn creator() -> Creator {
    Creator {
        id: "u1".to_string(),
        name: "Reader".to_string(),
        metadata: Default::default(),
    }
}

pub fn record(id: &str, motivation: Motivation, target: Vec<Target>) -> Annotation {
    Annotation {
        id: id.to_string(),
        creator: creator(),
        motivation,
        body: AnnotationBody::text("note"),
        target,
        created: epoch(),
        modified: epoch(),
    }
}

pub fn comment(id: &str, element: &str, start: usize, end: usize) -> Annotation {
    record(
        id,
        Motivation::Comment,
        vec![Target::with_selector(ParentRef::element(element), Selector::new("", start, end))],
    )
}

pub fn reply(id: &str, parent: &str) -> Annotation {
    record(id, Motivation::Reply, vec![Target::whole(ParentRef::annotation(parent))])
}
