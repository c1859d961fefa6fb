use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::Query;
use chrono::NaiveDate;
use handlebars::{Handlebars, handlebars_helper};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::auth::{AllowList, require_auth};
use crate::config::{ChartConfig, Config};
use crate::downloader::ExportFormat;
use crate::error::DashboardError;
use crate::filter::{FilterSpec, filter};
use crate::graph::{ChartName, render_chart};
use crate::loader::load_records;
use crate::record::{DashboardOptions, RawStore};
use crate::table::AggregateTable;
use crate::views::{self, ChartMode, Dashboard, Kpis};

const DASHBOARD_PAGE: &str = include_str!("./static/dashboard.hbs");

handlebars_helper!(money: |v: f64| format!("{:.2}", v));

lazy_static! {
    static ref TEMPLATES: Handlebars<'static> = {
        let mut registry = Handlebars::new();
        registry.register_helper("money", Box::new(money));
        registry
    };
}

/// Shared, read-only state behind every request.
pub struct AppState {
    store: RawStore,
    table: AggregateTable,
    options: DashboardOptions,
    charts: ChartConfig,
    static_dir: String,
}

impl AppState {
    /// Aggregate the loaded records and work out the control options
    ///
    /// # Arguments
    /// * `store` - Records from the loader
    /// * `charts` - Pixel size of rendered charts
    /// * `static_dir` - Directory served under `/static`
    ///
    /// # Returns
    /// * `Result<AppState, DashboardError>` - The state, or `EmptyFile` when
    ///   there are no records to derive options from
    pub fn new(
        store: RawStore,
        charts: ChartConfig,
        static_dir: impl Into<String>,
    ) -> Result<Self, DashboardError> {
        let options = store.options().ok_or(DashboardError::EmptyFile)?;
        let table = AggregateTable::aggregate(store.records());
        Ok(AppState {
            store,
            table,
            options,
            charts,
            static_dir: static_dir.into(),
        })
    }
}

/// Query string shared by the page, the JSON view and the chart/export routes.
///
/// `ps` and `country` repeat once per selected value. `applied` is sent by
/// the page form: without it the default selection is used for missing
/// lists, with it a missing list means nothing is selected.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub ps: Vec<i64>,
    #[serde(default)]
    pub country: Vec<String>,
    pub mode: Option<ChartMode>,
    pub applied: Option<String>,
}

impl DashboardQuery {
    pub fn filter_spec(&self, options: &DashboardOptions) -> FilterSpec {
        let initial = self.applied.is_none();
        let ps_ids = if initial && self.ps.is_empty() {
            vec![options.default_ps_id]
        } else {
            self.ps.clone()
        };
        let countries = if initial && self.country.is_empty() {
            vec![options.default_country.clone()]
        } else {
            self.country.clone()
        };
        FilterSpec::new(
            self.start.unwrap_or(options.min_date),
            self.end.unwrap_or(options.max_date),
            ps_ids,
            countries,
        )
    }

    pub fn mode(&self) -> ChartMode {
        self.mode.unwrap_or_default()
    }
}

fn mode_slug(mode: ChartMode) -> &'static str {
    match mode {
        ChartMode::Pie => "pie",
        ChartMode::Bar => "bar",
    }
}

/// Encode a resolved selection back into a query string, so chart images
/// and export links reproduce exactly what the page shows.
pub fn query_string(spec: &FilterSpec, mode: ChartMode) -> String {
    let mut parts = vec![
        format!("start={}", spec.date_start),
        format!("end={}", spec.date_end),
    ];
    parts.extend(spec.ps_ids.iter().map(|id| format!("ps={}", id)));
    parts.extend(
        spec.countries
            .iter()
            .map(|c| format!("country={}", urlencoding::encode(c))),
    );
    parts.push(format!("mode={}", mode_slug(mode)));
    parts.push("applied=1".to_string());
    parts.join("&")
}

#[derive(Serialize)]
struct SelectOption {
    value: String,
    selected: bool,
}

#[derive(Serialize)]
struct PageContext {
    min_date: String,
    max_date: String,
    /// Last selectable end date; the end bound is exclusive
    end_max: String,
    start: String,
    end: String,
    ps_options: Vec<SelectOption>,
    country_options: Vec<SelectOption>,
    bar_mode: bool,
    kpis: Kpis,
    query: String,
    pie_query: String,
    bar_query: String,
    lower_charts: [&'static str; 2],
}

/// Build the router with authentication and request logging on every route.
pub fn router(state: Arc<AppState>, allow_list: Arc<AllowList>) -> Router {
    let static_dir = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/options", get(get_options))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/chart/:name", get(get_chart))
        .route("/api/export/:format", get(export_rows))
        .nest_service("/static", static_dir)
        .layer(middleware::from_fn_with_state(allow_list, require_auth))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Loading records from: {}", config.data.csv_path);
    let store = load_records(&config.data.csv_path)?;
    let allow_list = Arc::new(AllowList::from_config(&config.auth)?);
    let state = Arc::new(AppState::new(
        store,
        config.charts,
        config.server.static_dir.clone(),
    )?);
    log::info!(
        "Loaded {} records into {} aggregate rows spanning {} to {}, {} users allowed",
        state.store.len(),
        state.table.len(),
        state.options.min_date,
        state.options.max_date,
        allow_list.len()
    );

    let app = router(state, allow_list);

    let listener = TcpListener::bind(&config.server.bind).await?;
    log::info!("Listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    log::info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Result<Html<String>, DashboardError> {
    let spec = params.filter_spec(&state.options);
    let mode = params.mode();
    let rows = filter(state.table.rows(), &spec);

    let context = PageContext {
        min_date: state.options.min_date.to_string(),
        max_date: state.options.max_date.to_string(),
        end_max: state
            .options
            .max_date
            .succ_opt()
            .unwrap_or(state.options.max_date)
            .to_string(),
        start: spec.date_start.to_string(),
        end: spec.date_end.to_string(),
        ps_options: state
            .options
            .ps_ids
            .iter()
            .map(|id| SelectOption {
                value: id.to_string(),
                selected: spec.ps_ids.contains(id),
            })
            .collect(),
        country_options: state
            .options
            .countries
            .iter()
            .map(|c| SelectOption {
                value: c.clone(),
                selected: spec.countries.contains(c),
            })
            .collect(),
        bar_mode: mode == ChartMode::Bar,
        kpis: views::kpis(&rows),
        query: query_string(&spec, mode),
        pie_query: query_string(&spec, ChartMode::Pie),
        bar_query: query_string(&spec, ChartMode::Bar),
        lower_charts: match mode {
            ChartMode::Pie => [ChartName::CardBrand.slug(), ChartName::PaymentMethod.slug()],
            ChartMode::Bar => [
                ChartName::RevenueByDate.slug(),
                ChartName::ClicksByGender.slug(),
            ],
        },
    };

    let page = TEMPLATES
        .render_template(DASHBOARD_PAGE, &context)
        .map_err(|e| DashboardError::Template(e.to_string()))?;
    Ok(Html(page))
}

async fn get_options(State(state): State<Arc<AppState>>) -> Json<DashboardOptions> {
    Json(state.options.clone())
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Json<Dashboard> {
    let spec = params.filter_spec(&state.options);
    Json(views::render(&state.table, &spec, params.mode()))
}

async fn get_chart(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Result<Response, DashboardError> {
    let Some(chart) = ChartName::from_slug(&name) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let spec = params.filter_spec(&state.options);

    // plotters rasterises on the CPU, keep it off the async workers
    let png = tokio::task::spawn_blocking(move || {
        let rows = filter(state.table.rows(), &spec);
        render_chart(chart, &rows, state.charts)
    })
    .await
    .map_err(|e| DashboardError::Chart(e.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

async fn export_rows(
    Path(format): Path<String>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Result<Response, DashboardError> {
    let Some(format) = ExportFormat::from_slug(&format) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let spec = params.filter_spec(&state.options);
    let rows = filter(state.table.rows(), &spec);
    let body = format.export(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> DashboardOptions {
        DashboardOptions {
            ps_ids: vec![7, 3],
            countries: vec!["US".to_string(), "Côte d'Ivoire".to_string()],
            min_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            max_date: NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
            default_ps_id: 7,
            default_country: "US".to_string(),
        }
    }

    #[test]
    fn test_initial_query_uses_defaults() {
        let spec = DashboardQuery::default().filter_spec(&options());
        assert_eq!(spec, FilterSpec::initial(&options()));
    }

    #[test]
    fn test_applied_query_keeps_empty_selection() {
        let query = DashboardQuery {
            ps: vec![3],
            applied: Some("1".to_string()),
            ..Default::default()
        };
        let spec = query.filter_spec(&options());
        assert_eq!(spec.ps_ids.into_iter().collect::<Vec<_>>(), vec![3]);
        assert!(spec.countries.is_empty());
    }

    #[test]
    fn test_query_string_encodes_selection() {
        let spec = FilterSpec::new(
            NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            [3, 7],
            ["Côte d'Ivoire"],
        );
        let qs = query_string(&spec, ChartMode::Bar);
        assert_eq!(
            qs,
            "start=2021-02-01&end=2021-03-01&ps=3&ps=7&country=C%C3%B4te%20d%27Ivoire&mode=bar&applied=1"
        );
    }

    #[test]
    fn test_money_helper() {
        let out = TEMPLATES
            .render_template("{{money v}}", &serde_json::json!({ "v": 1.5 }))
            .unwrap();
        assert_eq!(out, "1.50");
    }
}
