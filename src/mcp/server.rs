use std::collections::HashMap;
use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};

use chrono::NaiveDate;
use lru::LruCache;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::{debug, info, warn};

use crate::config::types::CacheConfig;
use crate::domain::booking::BookingDraft;
use crate::domain::coupon::AppliedCoupon;
use crate::domain::pricing::{AddOnSelection, DEFAULT_GUESTS, price};
use crate::domain::reservation::nights_between;
use crate::domain::selection::{PickContext, SelectionState};
use crate::engine::BookingEngine;
use crate::error::{BookingError, Result as BookingResult};

// ---------- Resource Store ----------

/// Text snapshots of fetched unit data exposed as MCP resources.
/// Keys are URIs like `booking://unit/gintaras`.
#[derive(Clone, Default)]
pub struct ResourceStore {
    entries: Arc<RwLock<HashMap<String, ResourceEntry>>>,
}

#[derive(Clone)]
struct ResourceEntry {
    name: String,
    text: String,
}

impl ResourceStore {
    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.write().await.insert(
            uri.into(),
            ResourceEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish()
    }
}

// ---------- Selection Sessions ----------

const FALLBACK_SESSION_CAPACITY: NonZeroUsize = NonZeroUsize::new(1_000).unwrap();

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionEntry {
    unit_id: String,
    selection: SelectionState,
    touched: Instant,
}

type SessionMap = LruCache<String, SessionEntry>;

/// Per-session range selection. One browsing session follows one unit;
/// picking for another unit starts that session over.
///
/// Session ids come from callers, so the map is an LRU bounded by
/// `max_sessions` and entries idle for longer than `idle_ttl` are dropped.
#[derive(Clone)]
pub struct SelectionSessions {
    entries: Arc<Mutex<SessionMap>>,
    idle_ttl: Duration,
}

impl SelectionSessions {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_sessions).unwrap_or_else(|| {
            warn!("Cache max_sessions was 0, defaulting to 1000");
            FALLBACK_SESSION_CAPACITY
        });
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(cap))),
            idle_ttl,
        }
    }

    fn expire(&self, entries: &mut SessionMap, session_id: &str) {
        if entries
            .peek(session_id)
            .is_some_and(|e| e.touched.elapsed() > self.idle_ttl)
        {
            entries.pop(session_id);
            debug!(session_id, "Idle selection session dropped");
        }
    }

    #[cfg(test)]
    async fn current(&self, session_id: &str, unit_id: &str) -> SelectionState {
        let mut entries = self.entries.lock().await;
        self.expire(&mut entries, session_id);
        entries
            .get(session_id)
            .filter(|e| e.unit_id == unit_id)
            .map_or(SelectionState::Empty, |e| e.selection)
    }

    /// Read-modify-write one session under a single lock. Returns the state
    /// the transition started from alongside its outcome; on error the
    /// stored state is left as it was.
    async fn apply(
        &self,
        session_id: &str,
        unit_id: &str,
        transition: impl FnOnce(SelectionState) -> BookingResult<SelectionState>,
    ) -> (SelectionState, BookingResult<SelectionState>) {
        let mut entries = self.entries.lock().await;
        self.expire(&mut entries, session_id);
        let current = entries
            .get(session_id)
            .filter(|e| e.unit_id == unit_id)
            .map_or(SelectionState::Empty, |e| e.selection);
        let outcome = transition(current);
        if let Ok(next) = &outcome {
            entries.put(
                session_id.to_string(),
                SessionEntry {
                    unit_id: unit_id.to_string(),
                    selection: *next,
                    touched: Instant::now(),
                },
            );
        }
        (current, outcome)
    }

    async fn selection_for(&self, session_id: &str) -> Option<(String, SelectionState)> {
        let mut entries = self.entries.lock().await;
        self.expire(&mut entries, session_id);
        entries.get_mut(session_id).map(|e| {
            e.touched = Instant::now();
            (e.unit_id.clone(), e.selection)
        })
    }

    /// Forget the selection, returning whether there was one.
    async fn reset(&self, session_id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        self.expire(&mut entries, session_id);
        entries.pop(session_id).is_some()
    }
}

impl From<&CacheConfig> for SelectionSessions {
    fn from(config: &CacheConfig) -> Self {
        Self::new(
            config.max_sessions,
            Duration::from_secs(config.session_idle_secs),
        )
    }
}

impl Default for SelectionSessions {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl std::fmt::Debug for SelectionSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionSessions")
            .field("idle_ttl", &self.idle_ttl)
            .finish_non_exhaustive()
    }
}

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UnitToolParams {
    /// Rental unit ID (e.g. "gintaras")
    pub unit_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PickDateToolParams {
    /// Caller-chosen identifier for this browsing session
    pub session_id: String,
    /// Rental unit ID
    pub unit_id: String,
    /// Picked date (YYYY-MM-DD)
    pub date: String,
    /// Whether the guest has accepted the house rules. Picks are refused until they do.
    #[serde(default)]
    pub rules_accepted: bool,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ResetSelectionToolParams {
    /// Session whose selection should be cleared
    pub session_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QuoteToolParams {
    /// Rental unit ID
    pub unit_id: String,
    /// Check-in date (YYYY-MM-DD)
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD), the morning the guest leaves
    pub check_out: String,
    /// Guest brings pets (flat fee once per stay)
    pub has_pets: Option<bool>,
    /// Extra bed (flat fee, only for units that offer it)
    pub extra_bed: Option<bool>,
    /// Number of guests (default: 2)
    pub guests: Option<u32>,
    /// Discount code to apply
    pub coupon_code: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CouponToolParams {
    /// Discount code (case-sensitive)
    pub code: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SubmitToolParams {
    /// Rental unit ID
    pub unit_id: String,
    /// Session whose completed selection supplies the dates when they are omitted
    pub session_id: Option<String>,
    /// Check-in date (YYYY-MM-DD)
    pub check_in: Option<String>,
    /// Check-out date (YYYY-MM-DD)
    pub check_out: Option<String>,
    /// Guest full name
    pub guest_name: Option<String>,
    /// Guest email, receives the payment receipt
    pub guest_email: Option<String>,
    /// Guest phone number
    pub phone: Option<String>,
    /// Guest country
    pub country: Option<String>,
    /// Number of guests
    pub guests: Option<u32>,
    pub has_pets: Option<bool>,
    pub extra_bed: Option<bool>,
    /// House rules accepted
    pub rules_accepted: Option<bool>,
    /// Discount code, re-validated at submission
    pub coupon_code: Option<String>,
}

fn parse_date(field: &str, raw: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| BookingError::InvalidInput {
        reason: format!("{field} must be a YYYY-MM-DD date, got '{raw}'"),
    })
}

fn parse_optional_date(field: &str, raw: Option<&str>) -> BookingResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => parse_date(field, s).map(Some),
        _ => Ok(None),
    }
}

fn tool_error(text: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text)])
}

fn tool_text(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

#[derive(Clone)]
pub struct BookingMcpServer {
    engine: BookingEngine,
    tool_router: ToolRouter<Self>,
    sessions: SelectionSessions,
    resources: ResourceStore,
}

#[tool_router]
impl BookingMcpServer {
    pub fn new(engine: BookingEngine) -> Self {
        Self::with_sessions(engine, SelectionSessions::default())
    }

    pub fn with_sessions(engine: BookingEngine, sessions: SelectionSessions) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
            sessions,
            resources: ResourceStore::default(),
        }
    }

    async fn coupon_for(&self, code: Option<&str>) -> BookingResult<Option<AppliedCoupon>> {
        match code.map(str::trim) {
            Some(c) if !c.is_empty() => self.engine.coupons.validate(c).await.map(Some),
            _ => Ok(None),
        }
    }

    /// Unit name, nightly rate and extra-bed availability.
    #[tool(
        name = "booking_unit_details",
        description = "Get a rental unit's name, description, nightly rate and whether it offers an extra bed.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn booking_unit_details(
        &self,
        Parameters(params): Parameters<UnitToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.engine.units.unit(&params.unit_id).await {
            Ok(unit) => {
                let text = unit.to_string();
                let uri = format!("booking://unit/{}", unit.id);
                let name = format!("Unit: {}", unit.name);
                self.resources.insert(uri, name, text.clone()).await;
                Ok(tool_text(text))
            }
            Err(e) => Ok(tool_error(format!(
                "Failed to get unit '{}': {e}",
                params.unit_id
            ))),
        }
    }

    /// Booked nights for a unit, read fresh from the store.
    #[tool(
        name = "booking_availability",
        description = "List the booked nights of a rental unit as date runs. Reservations are re-read on every call. Dates before today are never selectable.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn booking_availability(
        &self,
        Parameters(params): Parameters<UnitToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.engine.units.availability(&params.unit_id).await {
            Ok((unit, unavailable)) => {
                let mut text = unavailable.to_string();
                let _ = writeln!(text, "\nToday: {}", self.engine.clock.today());
                let uri = format!("booking://unit/{}/availability", unit.id);
                let name = format!("Availability: {}", unit.name);
                self.resources.insert(uri, name, text.clone()).await;
                Ok(tool_text(text))
            }
            Err(e) => Ok(tool_error(format!(
                "Failed to get availability for '{}': {e}",
                params.unit_id
            ))),
        }
    }

    /// Apply one date pick to the session's range selection.
    #[tool(
        name = "booking_pick_date",
        description = "Pick a check-in or check-out date for a browsing session. The first pick sets check-in; a later date completes the range if every date up to it is free; an earlier or equal date restarts from there; a pick after a complete range starts a new one. Rejected picks leave the selection unchanged. Requires rules_accepted = true.",
        annotations(read_only_hint = false, idempotent_hint = false, open_world_hint = true)
    )]
    async fn booking_pick_date(
        &self,
        Parameters(params): Parameters<PickDateToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let date = match parse_date("date", &params.date) {
            Ok(d) => d,
            Err(e) => return Ok(tool_error(e.to_string())),
        };
        let (_, unavailable) = match self.engine.units.availability(&params.unit_id).await {
            Ok(found) => found,
            Err(e) => {
                return Ok(tool_error(format!(
                    "Could not check availability for '{}': {e}",
                    params.unit_id
                )));
            }
        };

        let ctx = PickContext {
            unavailable: &unavailable,
            today: self.engine.clock.today(),
            rules_accepted: params.rules_accepted,
        };
        let (current, outcome) = self
            .sessions
            .apply(&params.session_id, &params.unit_id, |state| {
                state.pick_date(date, &ctx)
            })
            .await;

        match outcome {
            Ok(next) => {
                debug!(session_id = %params.session_id, state = ?next, "Selection updated");
                let mut text = next.to_string();
                if next.is_complete() {
                    text.push_str("\nRange complete. Use booking_quote or booking_submit next.");
                }
                Ok(tool_text(text))
            }
            Err(e) if e.is_selection_error() => Ok(tool_error(format!(
                "{e}\nSelection unchanged: {current}"
            ))),
            Err(e) => Ok(tool_error(format!("Pick failed: {e}"))),
        }
    }

    #[tool(
        name = "booking_reset_selection",
        description = "Clear a browsing session's date selection.",
        annotations(read_only_hint = false, idempotent_hint = true, open_world_hint = false)
    )]
    async fn booking_reset_selection(
        &self,
        Parameters(params): Parameters<ResetSelectionToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = if self.sessions.reset(&params.session_id).await {
            "Selection cleared.".to_string()
        } else {
            "No selection to clear.".to_string()
        };
        Ok(tool_text(text))
    }

    /// Itemised price for a stay.
    #[tool(
        name = "booking_quote",
        description = "Price a stay: nights x nightly rate, plus one-off pet and extra-bed fees, minus a coupon percentage applied to that whole subtotal. Does not check availability.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn booking_quote(
        &self,
        Parameters(params): Parameters<QuoteToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result: BookingResult<String> = async {
            let check_in = parse_date("check_in", &params.check_in)?;
            let check_out = parse_date("check_out", &params.check_out)?;
            let nights = nights_between(check_in, check_out)?;
            let unit = self.engine.units.unit(&params.unit_id).await?;
            let coupon = self.coupon_for(params.coupon_code.as_deref()).await?;
            let add_ons = AddOnSelection {
                has_pets: params.has_pets.unwrap_or(false),
                extra_bed: params.extra_bed.unwrap_or(false),
                guests: params.guests.unwrap_or(DEFAULT_GUESTS),
            };
            let quote = price(&unit, nights, &add_ons, coupon.as_ref(), &self.engine.policy)?;
            let mut text = quote.to_string();
            if add_ons.extra_bed && !unit.extra_bed_allowed {
                let _ = writeln!(text, "\nNote: {} does not offer an extra bed.", unit.name);
            }
            Ok(text)
        }
        .await;

        match result {
            Ok(text) => Ok(tool_text(text)),
            Err(e) => Ok(tool_error(format!("Quote failed: {e}"))),
        }
    }

    #[tool(
        name = "booking_validate_coupon",
        description = "Check a discount code. Codes are case-sensitive and must be active and unexpired.",
        annotations(read_only_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    async fn booking_validate_coupon(
        &self,
        Parameters(params): Parameters<CouponToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.engine.coupons.validate(&params.code).await {
            Ok(applied) => Ok(tool_text(format!("Coupon {applied} is valid."))),
            Err(e) => Ok(tool_error(e.to_string())),
        }
    }

    /// Re-check availability, price and open a checkout session.
    #[tool(
        name = "booking_submit",
        description = "Submit a booking for payment. Availability is re-checked against fresh reservations, all guest fields and house-rules acceptance are required, the price is recomputed, and a payment checkout session is created. Returns the URL to complete payment. If the dates were taken meanwhile, the session's selection is cleared and new dates must be picked.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false, open_world_hint = true)
    )]
    async fn booking_submit(
        &self,
        Parameters(params): Parameters<SubmitToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result: BookingResult<String> = async {
            let mut draft = BookingDraft {
                unit_id: params.unit_id.clone(),
                check_in: parse_optional_date("check_in", params.check_in.as_deref())?,
                check_out: parse_optional_date("check_out", params.check_out.as_deref())?,
                guest_name: params.guest_name.clone(),
                guest_email: params.guest_email.clone(),
                phone: params.phone.clone(),
                country: params.country.clone(),
                guests: params.guests,
                has_pets: params.has_pets.unwrap_or(false),
                extra_bed: params.extra_bed.unwrap_or(false),
                rules_accepted: params.rules_accepted.unwrap_or(false),
                coupon: None,
                coupon_code: params.coupon_code.clone(),
            };
            if draft.check_in.is_none()
                && draft.check_out.is_none()
                && let Some(ref session_id) = params.session_id
                && let Some((unit_id, selection)) = self.sessions.selection_for(session_id).await
                && unit_id == params.unit_id
            {
                draft = draft.with_selection(&selection);
            }
            let handle = self.engine.guard.submit(&draft).await?;
            Ok(handle.to_string())
        }
        .await;

        match result {
            Ok(text) => Ok(tool_text(text)),
            Err(e) => {
                if e.requires_date_reselection()
                    && let Some(ref session_id) = params.session_id
                {
                    self.sessions.reset(session_id).await;
                    info!(session_id = %session_id, "Selection cleared after availability change");
                    return Ok(tool_error(format!(
                        "{e}\nThe date selection was cleared; pick new dates with booking_pick_date."
                    )));
                }
                Ok(tool_error(format!("Booking not submitted: {e}")))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for BookingMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Vacation rental booking server: availability, date selection, pricing and checkout.\n\
                 \n\
                 ## Flow\n\
                 1. booking_unit_details / booking_availability to look at a unit\n\
                 2. booking_pick_date (twice) with a session_id to select check-in and check-out; \
                 the guest must accept the house rules first\n\
                 3. booking_quote for an itemised price, booking_validate_coupon for discount codes\n\
                 4. booking_submit with guest details to get a payment URL\n\
                 \n\
                 ## Notes\n\
                 - Check-out is the departure morning; that night is not occupied.\n\
                 - Past dates are never selectable.\n\
                 - booking_submit re-checks availability. If the dates were taken, the session \
                 selection is cleared and new dates must be picked.\n\
                 - Coupon discounts apply to the nightly total plus add-on fees."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let entries = self.resources.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![
            ResourceTemplate {
                annotations: None,
                raw: RawResourceTemplate {
                    uri_template: "booking://unit/{id}".into(),
                    name: "Rental Unit".into(),
                    title: Some("Unit details".into()),
                    description: Some("Unit details (fetched via booking_unit_details)".into()),
                    mime_type: Some("text/plain".into()),
                    icons: None,
                },
            },
            ResourceTemplate {
                annotations: None,
                raw: RawResourceTemplate {
                    uri_template: "booking://unit/{id}/availability".into(),
                    name: "Unit Availability".into(),
                    title: Some("Booked nights".into()),
                    description: Some(
                        "Booked night runs at the time of the last booking_availability call"
                            .into(),
                    ),
                    mime_type: Some("text/plain".into()),
                    icons: None,
                },
            },
        ];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.resources.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}
