use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chart::{load_chart, AwardChart, ChartResolver, ProgramId, Route};
use crate::config::Config;
use crate::evaluator::{evaluate_route, RouteEvaluation};
use crate::simulator::{normalize_top_up_amount, simulate_top_up, TopUp, TopUpOutcome};
use crate::transfer::TransferGraph;
use crate::wallet::{
    aggregate, normalize_points, BalanceSheet, WalletRecord, WalletSource, WalletStore,
};

#[derive(Clone)]
struct ApiState {
    config: Config,
    resolver: ChartResolver,
    graph: TransferGraph,
    db_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Default, Deserialize)]
struct CommandContextRequest {
    user: Option<String>,
    /// Balance overrides, slug to points: each entry replaces the
    /// aggregated balance for that program.
    #[serde(default)]
    balances: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct EvaluateRequest {
    from: String,
    to: String,
    #[serde(flatten)]
    context: CommandContextRequest,
}

#[derive(Debug, Clone, Deserialize)]
struct TopUpRequest {
    from: String,
    to: String,
    program: Option<String>,
    amount: Option<f64>,
    #[serde(flatten)]
    context: CommandContextRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WalletsQuery {
    user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WalletUpsertRequest {
    user: Option<String>,
    program: String,
    points: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct WalletDeleteRequest {
    user: Option<String>,
    program: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct EvaluateResponse {
    user: String,
    balances: BalanceSheet,
    evaluation: RouteEvaluation,
}

#[derive(Debug, Serialize)]
struct TopUpResponse {
    user: String,
    outcome: TopUpOutcome,
}

#[derive(Debug, Serialize)]
struct WalletsResponse {
    user: String,
    wallets: Vec<WalletRecord>,
    total_points: u64,
}

#[derive(Debug, Serialize)]
struct RouteListing {
    route: String,
    prices: BTreeMap<ProgramId, u64>,
}

#[derive(Debug, Serialize)]
struct RoutesResponse {
    routes: Vec<RouteListing>,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let chart = match config.resolved_chart_path() {
        Some(path) => load_chart(&path)?,
        None => AwardChart::builtin(),
    };
    let state = ApiState {
        resolver: ChartResolver::new(chart, config.chart.policy),
        graph: config.transfer_graph(),
        db_path: config.resolved_db_path(),
        config,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/routes", get(routes))
        .route("/v1/evaluate", post(evaluate))
        .route("/v1/topup", post(topup))
        .route(
            "/v1/wallets",
            get(wallets_list).post(wallets_upsert).delete(wallets_delete),
        )
        .route("/v1/config", get(show_config))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn routes(State(state): State<ApiState>) -> Json<ApiResponse<RoutesResponse>> {
    let routes = state
        .resolver
        .routes()
        .map(|(route, prices)| RouteListing {
            route: route.to_string(),
            prices: prices.clone(),
        })
        .collect();
    ok(RoutesResponse { routes })
}

async fn evaluate(
    State(state): State<ApiState>,
    Json(request): Json<EvaluateRequest>,
) -> ApiResult<EvaluateResponse> {
    let route = parse_route(&request.from, &request.to)?;
    let user = resolve_user(&state, request.context.user.as_deref());
    let balances = load_balances(&state, &user, &request.context.balances)?;
    let evaluation = evaluate_route(&route, &balances, &state.resolver, &state.graph);

    Ok(ok(EvaluateResponse {
        user,
        balances,
        evaluation,
    }))
}

async fn topup(
    State(state): State<ApiState>,
    Json(request): Json<TopUpRequest>,
) -> ApiResult<TopUpResponse> {
    let route = parse_route(&request.from, &request.to)?;
    let user = resolve_user(&state, request.context.user.as_deref());
    let balances = load_balances(&state, &user, &request.context.balances)?;

    // An unset program or a degenerate amount is the identity top-up.
    let top_up = match request.program.as_deref() {
        Some(slug) => {
            let program = ProgramId::from_str(slug)
                .map_err(|error| ApiError::bad_request(error.to_string()))?;
            let amount = normalize_top_up_amount(request.amount.unwrap_or(0.0));
            Some(TopUp { program, amount })
        }
        None => None,
    };

    let outcome = simulate_top_up(top_up, &route, &balances, &state.resolver, &state.graph);
    Ok(ok(TopUpResponse { user, outcome }))
}

async fn wallets_list(
    State(state): State<ApiState>,
    Query(query): Query<WalletsQuery>,
) -> ApiResult<WalletsResponse> {
    let user = resolve_user(&state, query.user.as_deref());
    let store = open_store(&state)?;
    let wallets = store.load_wallets(&user).map_err(ApiError::internal)?;
    let total_points = aggregate(&wallets).total_points();

    Ok(ok(WalletsResponse {
        user,
        wallets,
        total_points,
    }))
}

async fn wallets_upsert(
    State(state): State<ApiState>,
    Json(request): Json<WalletUpsertRequest>,
) -> ApiResult<WalletsResponse> {
    let program = request.program.trim().to_ascii_lowercase();
    if program.is_empty() {
        return Err(ApiError::bad_request("program is required"));
    }
    let user = resolve_user(&state, request.user.as_deref());
    let store = open_store(&state)?;
    store
        .upsert_wallet(&user, &program, normalize_points(request.points))
        .map_err(ApiError::internal)?;
    let wallets = store.load_wallets(&user).map_err(ApiError::internal)?;
    let total_points = aggregate(&wallets).total_points();

    Ok(ok(WalletsResponse {
        user,
        wallets,
        total_points,
    }))
}

async fn wallets_delete(
    State(state): State<ApiState>,
    Json(request): Json<WalletDeleteRequest>,
) -> ApiResult<WalletsResponse> {
    let user = resolve_user(&state, request.user.as_deref());
    let store = open_store(&state)?;
    store
        .delete_wallet(&user, request.program.trim())
        .map_err(ApiError::internal)?;
    let wallets = store.load_wallets(&user).map_err(ApiError::internal)?;
    let total_points = aggregate(&wallets).total_points();

    Ok(ok(WalletsResponse {
        user,
        wallets,
        total_points,
    }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn open_store(state: &ApiState) -> std::result::Result<WalletStore, ApiError> {
    WalletStore::open(&state.db_path).map_err(ApiError::internal)
}

fn resolve_user(state: &ApiState, requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.user.email.clone())
}

fn parse_route(from: &str, to: &str) -> std::result::Result<Route, ApiError> {
    Route::new(from, to).map_err(|error| ApiError::bad_request(error.to_string()))
}

fn load_balances(
    state: &ApiState,
    user: &str,
    overrides: &BTreeMap<String, f64>,
) -> std::result::Result<BalanceSheet, ApiError> {
    let store = open_store(state)?;
    let wallets = store.load_wallets(user).map_err(ApiError::internal)?;
    let mut balances = aggregate(&wallets);
    for (slug, raw) in overrides {
        let program =
            ProgramId::from_str(slug).map_err(|error| ApiError::bad_request(error.to_string()))?;
        balances.set_points(program, normalize_points(*raw));
    }
    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::{health, parse_route};

    #[test]
    fn parses_route_pairs() {
        let route = parse_route("lax", "LHR").expect("failed to parse route");
        assert_eq!(route.to_string(), "LAX-LHR");
        assert!(parse_route("LAX", "L0NDON").is_err());
    }

    #[test]
    fn health_reports_ok() {
        let response = tokio_test::block_on(health());
        assert!(response.0.ok);
        assert_eq!(response.0.data.status, "ok");
    }
}
