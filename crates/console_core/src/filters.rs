//! Document listing filters and their query-string form.
//!
//! The query string is canonical and minimal: a field equal to its default never
//! appears, any other field always does. Decoding never fails; anything missing
//! or malformed falls back to the default, so `decode(&encode(f)) == f` holds for
//! every state produced by [`FilterState::apply`] or [`decode`].

use url::form_urlencoded;

/// Sentinel used by select controls for "no restriction".
pub const ALL: &str = "__all__";

pub const DEFAULT_SORT_FIELD: &str = "fecha";
pub const DEFAULT_PAGE_SIZE: u32 = 50;

// Query parameter names. Bookmarked URLs depend on these; never rename.
const Q_SEARCH: &str = "search";
const Q_COMPANY: &str = "empresa";
const Q_PERIOD_FROM: &str = "desde";
const Q_PERIOD_TO: &str = "hasta";
const Q_TYPE: &str = "tipo";
const Q_DIRECTION: &str = "direccion";
const Q_SORT: &str = "sort";
const Q_ORDER: &str = "order";
const Q_PAGE: &str = "page";
const Q_LIMIT: &str = "limit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Whether a document was issued or received by the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Issued,
    Received,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Issued => "emitidas",
            Direction::Received => "recibidas",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "emitidas" => Some(Direction::Issued),
            "recibidas" => Some(Direction::Received),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub search: String,
    /// `None` means all companies.
    pub company_id: Option<String>,
    /// Year-month lower bound (`YYYY-MM`).
    pub period_from: Option<String>,
    pub period_to: Option<String>,
    /// `None` means all document types.
    pub document_type: Option<String>,
    pub direction: Option<Direction>,
    pub sort_field: String,
    pub sort_order: SortOrder,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            company_id: None,
            period_from: None,
            period_to: None,
            document_type: None,
            direction: None,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Partial update coming from a filter control.
///
/// String fields carry what the control produced: an empty string or [`ALL`]
/// resets the field to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub search: Option<String>,
    pub company_id: Option<String>,
    pub period_from: Option<String>,
    pub period_to: Option<String>,
    pub document_type: Option<String>,
    pub direction: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl FilterPatch {
    pub fn search(mut self, value: impl Into<String>) -> Self {
        self.search = Some(value.into());
        self
    }

    pub fn company(mut self, value: impl Into<String>) -> Self {
        self.company_id = Some(value.into());
        self
    }

    pub fn period_from(mut self, value: impl Into<String>) -> Self {
        self.period_from = Some(value.into());
        self
    }

    pub fn period_to(mut self, value: impl Into<String>) -> Self {
        self.period_to = Some(value.into());
        self
    }

    pub fn document_type(mut self, value: impl Into<String>) -> Self {
        self.document_type = Some(value.into());
        self
    }

    pub fn direction(mut self, value: impl Into<String>) -> Self {
        self.direction = Some(value.into());
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// True when the patch touches nothing but the free-text search.
    pub fn is_search_only(&self) -> bool {
        self.search.is_some()
            && *self
                == (FilterPatch {
                    search: self.search.clone(),
                    ..FilterPatch::default()
                })
    }
}

impl FilterState {
    /// Merge a patch. Unless the patch sets `page` explicitly the result is on page 1.
    pub fn apply(&self, patch: &FilterPatch) -> FilterState {
        let mut next = self.clone();
        if let Some(search) = &patch.search {
            next.search = search.clone();
        }
        if let Some(raw) = &patch.company_id {
            next.company_id = scoped(raw);
        }
        if let Some(raw) = &patch.period_from {
            next.period_from = non_empty(raw);
        }
        if let Some(raw) = &patch.period_to {
            next.period_to = non_empty(raw);
        }
        if let Some(raw) = &patch.document_type {
            next.document_type = scoped(raw);
        }
        if let Some(raw) = &patch.direction {
            next.direction = Direction::parse(raw);
        }
        if let Some(raw) = &patch.sort_field {
            next.sort_field = sort_field(raw);
        }
        if let Some(order) = patch.sort_order {
            next.sort_order = order;
        }
        if let Some(size) = patch.page_size {
            next.page_size = positive(size).unwrap_or(DEFAULT_PAGE_SIZE);
        }
        next.page = patch.page.and_then(positive).unwrap_or(1);
        next
    }

    /// Number of user-facing restrictions in effect (paging and sorting excluded).
    pub fn active_filter_count(&self) -> usize {
        [
            !self.search.is_empty(),
            self.company_id.is_some(),
            self.period_from.is_some(),
            self.period_to.is_some(),
            self.document_type.is_some(),
            self.direction.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Offset of the first row on the current page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Parameters for the paginated listing endpoint.
    pub fn api_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.scope_params();
        if let Some(direction) = self.direction {
            params.push(("direccion", direction.as_str().to_string()));
        }
        if !self.search.is_empty() {
            params.push(("search", self.search.clone()));
        }
        params.push(("sort_by", self.sort_field.clone()));
        params.push(("sort_order", self.sort_order.as_str().to_string()));
        params.push(("skip", self.skip().to_string()));
        params.push(("limit", self.page_size.to_string()));
        params
    }

    /// Parameters for the spreadsheet export of the whole filtered set.
    pub fn export_params(&self) -> Vec<(&'static str, String)> {
        self.scope_params()
    }

    fn scope_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(company) = &self.company_id {
            params.push(("empresa_id", company.clone()));
        }
        if let Some(from) = &self.period_from {
            params.push(("periodo", from.clone()));
        }
        if let Some(to) = &self.period_to {
            params.push(("periodo_hasta", to.clone()));
        }
        if let Some(kind) = &self.document_type {
            params.push(("tipo", kind.clone()));
        }
        params
    }
}

/// Canonical minimal query string (no leading `?`).
pub fn encode(filters: &FilterState) -> String {
    let defaults = FilterState::default();
    let mut out = form_urlencoded::Serializer::new(String::new());

    if filters.search != defaults.search {
        out.append_pair(Q_SEARCH, &filters.search);
    }
    if let Some(company) = &filters.company_id {
        out.append_pair(Q_COMPANY, company);
    }
    if let Some(from) = &filters.period_from {
        out.append_pair(Q_PERIOD_FROM, from);
    }
    if let Some(to) = &filters.period_to {
        out.append_pair(Q_PERIOD_TO, to);
    }
    if let Some(kind) = &filters.document_type {
        out.append_pair(Q_TYPE, kind);
    }
    if let Some(direction) = filters.direction {
        out.append_pair(Q_DIRECTION, direction.as_str());
    }
    if filters.sort_field != defaults.sort_field {
        out.append_pair(Q_SORT, &filters.sort_field);
    }
    if filters.sort_order != defaults.sort_order {
        out.append_pair(Q_ORDER, filters.sort_order.as_str());
    }
    if filters.page != defaults.page {
        out.append_pair(Q_PAGE, &filters.page.to_string());
    }
    if filters.page_size != defaults.page_size {
        out.append_pair(Q_LIMIT, &filters.page_size.to_string());
    }

    out.finish()
}

/// Parse a query string (with or without leading `?`). Never fails.
pub fn decode(query: &str) -> FilterState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    // First occurrence wins for repeated keys.
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let defaults = FilterState::default();
    FilterState {
        search: get(Q_SEARCH).map(str::to_string).unwrap_or(defaults.search),
        company_id: get(Q_COMPANY).and_then(scoped),
        period_from: get(Q_PERIOD_FROM).and_then(non_empty),
        period_to: get(Q_PERIOD_TO).and_then(non_empty),
        document_type: get(Q_TYPE).and_then(scoped),
        direction: get(Q_DIRECTION).and_then(Direction::parse),
        sort_field: get(Q_SORT).map(sort_field).unwrap_or(defaults.sort_field),
        sort_order: get(Q_ORDER)
            .and_then(SortOrder::parse)
            .unwrap_or(defaults.sort_order),
        page: get(Q_PAGE)
            .and_then(parse_positive)
            .unwrap_or(defaults.page),
        page_size: get(Q_LIMIT)
            .and_then(parse_positive)
            .unwrap_or(defaults.page_size),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn scoped(raw: &str) -> Option<String> {
    if raw == ALL {
        None
    } else {
        non_empty(raw)
    }
}

fn sort_field(raw: &str) -> String {
    non_empty(raw).unwrap_or_else(|| DEFAULT_SORT_FIELD.to_string())
}

fn positive(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().and_then(positive)
}
