use crate::{
    api::{attendance, person, scan},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("per_millisecond and burst_size are non-zero");
        Governor::new(&cfg)
    }

    let scan_limiter = build_limiter(config.rate_scan_per_min);
    let register_limiter = build_limiter(config.rate_register_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::resource("/scan")
                    .wrap(scan_limiter)
                    .route(web::post().to(scan::submit_scan)),
            )
            .service(
                web::scope("/persons")
                    // /persons
                    .service(
                        web::resource("")
                            .wrap(register_limiter)
                            .route(web::post().to(person::register_person)),
                    )
                    // /persons/{identity_token}
                    .service(
                        web::resource("/{identity_token}")
                            .route(web::get().to(person::get_person))
                            .route(web::delete().to(person::delete_person)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    // /attendance/today
                    .service(
                        web::resource("/today").route(web::get().to(attendance::today_attendance)),
                    )
                    // /attendance/{identity_token}/{date}
                    .service(
                        web::resource("/{identity_token}/{date}")
                            .route(web::get().to(attendance::get_record)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_pool;
    use crate::scan::{decoder::TokenDecoder, dispatcher::ScanDispatcher};
    use crate::store::{identity::IdentityStore, ledger::AttendanceLedger};
    use actix_web::web::Data;
    use actix_web::{App, http::StatusCode, test};
    use chrono::FixedOffset;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            server_addr: String::new(),
            db_max_connections: 4,
            utc_offset: FixedOffset::east_opt(0).unwrap(),
            identity_cache_capacity: 64,
            rate_scan_per_min: 10_000,
            rate_register_per_min: 10_000,
            scanner_stdin: false,
            log_dir: String::new(),
            api_prefix: "/api/v1".into(),
        }
    }

    macro_rules! app {
        ($pool:expr) => {{
            let config = test_config();
            let identities = IdentityStore::new($pool.clone(), 64);
            let ledger = AttendanceLedger::new($pool.clone(), config.utc_offset);
            let dispatcher =
                ScanDispatcher::new(Arc::new(TokenDecoder), identities.clone(), ledger.clone());
            test::init_service(
                App::new()
                    .app_data(Data::new(identities))
                    .app_data(Data::new(ledger))
                    .app_data(Data::new(dispatcher))
                    .configure(|cfg| configure(cfg, &config)),
            )
            .await
        }};
    }

    // the governor keys on the peer address
    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[actix_web::test]
    async fn register_scan_and_list() {
        let (pool, _dir) = temp_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/v1/persons")
            .peer_addr(peer())
            .set_json(json!({ "name": "Juan Dela Cruz", "role": "Teacher" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let token = body["qr_payload"].as_str().unwrap().to_string();
        assert_eq!(body["person"]["identity_token"], token.as_str());

        let scans = [
            ("2026-03-02T08:00:00Z", "TimeIn"),
            ("2026-03-02T16:00:00Z", "TimeOut"),
            ("2026-03-02T16:05:00Z", "Duplicate"),
        ];
        for (scanned_at, expected) in scans {
            let req = test::TestRequest::post()
                .uri("/api/v1/scan")
                .peer_addr(peer())
                .set_json(json!({ "payload": format!("{token}\n"), "scanned_at": scanned_at }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["status"], expected);
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/attendance?from=2026-03-01&to=2026-03-03&search=dela")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["duration_seconds"], 28_800);
        assert_eq!(body["data"][0]["duration"], "08:00:00");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/attendance/{token}/2026-03-02"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn error_kinds_map_to_statuses() {
        let (pool, _dir) = temp_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/v1/persons")
            .peer_addr(peer())
            .set_json(json!({ "name": "Pedro", "role": "Principal" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/scan")
            .peer_addr(peer())
            .set_json(json!({ "payload": "Pedro|123|CS|Student" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let req = test::TestRequest::post()
            .uri("/api/v1/scan")
            .peer_addr(peer())
            .set_json(json!({ "payload": "6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "Rejected");
        assert_eq!(body["reason"], "UnknownIdentity");

        let req = test::TestRequest::get()
            .uri("/api/v1/persons/6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/v1/attendance?from=2026-03-03&to=2026-03-01")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn storage_failures_are_service_unavailable() {
        let (pool, _dir) = temp_pool().await;
        let app = app!(pool);
        pool.close().await;

        let req = test::TestRequest::post()
            .uri("/api/v1/persons")
            .peer_addr(peer())
            .set_json(json!({ "name": "Juan Dela Cruz", "role": "Teacher" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Storage unavailable, contact the system admin");

        let req = test::TestRequest::get()
            .uri("/api/v1/attendance?from=2026-03-01&to=2026-03-03")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Storage unavailable, contact the system admin");
    }

    #[actix_web::test]
    async fn deleted_person_scans_are_rejected() {
        let (pool, _dir) = temp_pool().await;
        let app = app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/v1/persons")
            .peer_addr(peer())
            .set_json(json!({ "name": "Ana Reyes", "role": "Guest" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["qr_payload"].as_str().unwrap().to_string();

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/persons/{token}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/v1/scan")
            .peer_addr(peer())
            .set_json(json!({ "payload": token }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["reason"], "UnknownIdentity");
    }
}
