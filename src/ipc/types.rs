use crate::auth::AuthStore;
use crate::config::AppConfig;
use crate::model::{FilterCriteria, PageDescriptor, StudentRecord};
use crate::roster::RosterStore;
use crate::view::{self, CsvColumn, Projection};
use serde::Deserialize;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthStore,
    pub roster: RosterStore,
    pub view: Rc<RefCell<ViewState>>,
}

impl AppState {
    /// Wires the view to the roster so every mutation recomputes the projection.
    pub fn new(config: AppConfig, seed: Vec<StudentRecord>) -> Self {
        let mut roster = RosterStore::with_records(seed);
        let view = Rc::new(RefCell::new(ViewState::new(
            config.page_size,
            config.csv_columns.clone(),
            roster.version(),
            roster.records(),
        )));
        let listener = Rc::clone(&view);
        roster.subscribe(move |change| {
            listener.borrow_mut().refresh(change.version, change.records);
        });
        Self {
            config,
            auth: AuthStore::new(),
            roster,
            view,
        }
    }

    pub fn view_snapshot(&self) -> serde_json::Value {
        let mut view = self.view.borrow_mut();
        let version = self.roster.version();
        let criteria = view.criteria().clone();
        let projection = view.current(version, self.roster.records());
        let mut out = serde_json::to_value(projection).unwrap_or_else(|_| json!({}));
        out["criteria"] = json!(criteria);
        out["rosterVersion"] = json!(version);
        out
    }
}

struct CachedProjection {
    version: u64,
    criteria: FilterCriteria,
    page_index: usize,
    projection: Projection,
}

/// Current filter and page selection plus the last projection computed for them.
pub struct ViewState {
    criteria: FilterCriteria,
    page_index: usize,
    page_size: usize,
    columns: Vec<CsvColumn>,
    cached: CachedProjection,
}

impl ViewState {
    pub fn new(
        page_size: usize,
        columns: Vec<CsvColumn>,
        version: u64,
        records: &[StudentRecord],
    ) -> Self {
        let criteria = FilterCriteria::default();
        let projection = view::project(records, &criteria, PageDescriptor::first(page_size), &columns);
        Self {
            criteria: criteria.clone(),
            page_index: 1,
            page_size,
            columns,
            cached: CachedProjection {
                version,
                criteria,
                page_index: 1,
                projection,
            },
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// New criteria always send the view back to the first page.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.page_index = 1;
    }

    pub fn set_page(&mut self, index: usize) {
        self.page_index = index;
    }

    pub fn refresh(&mut self, version: u64, records: &[StudentRecord]) -> &Projection {
        let projection = view::project(
            records,
            &self.criteria,
            PageDescriptor {
                index: self.page_index,
                size: self.page_size,
            },
            &self.columns,
        );
        self.page_index = projection.page.index;
        self.cached = CachedProjection {
            version,
            criteria: self.criteria.clone(),
            page_index: self.page_index,
            projection,
        };
        &self.cached.projection
    }

    /// Returns the cached projection when `(version, criteria, page)` is unchanged.
    pub fn current(&mut self, version: u64, records: &[StudentRecord]) -> &Projection {
        let stale = self.cached.version != version
            || self.cached.criteria != self.criteria
            || self.cached.page_index != self.page_index;
        if stale {
            return self.refresh(version, records);
        }
        &self.cached.projection
    }
}
