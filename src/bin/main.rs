#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::sync::OnceLock;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    use chirp::core::db;
    use chirp::core::store::MemoryStore;

    // One store shared by every actix worker, the dev server keeps its
    // data in memory for as long as the process runs.
    static STORE: OnceLock<MemoryStore> = OnceLock::new();

    fn store() -> &'static MemoryStore {
        STORE.get_or_init(MemoryStore::new)
    }

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request, Response};

        pub fn actix_to_spin_request(
            req: &HttpRequest,
            body: actix_web::web::Bytes,
        ) -> anyhow::Result<Request> {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                _ => Method::Get,
            };

            let uri = req.uri().to_string();

            let mut builder = Request::builder();
            builder.method(method).uri(&uri);
            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    builder.header(name.as_str(), val_str);
                }
            }

            Ok(builder.body(body.to_vec()).build())
        }

        pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
            let status = *spin_resp.status();
            let mut response = actix_web::HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );

            // The handlers only ever set these two.
            for name in ["Content-Type", "Location"] {
                if let Some(val_str) = spin_resp.header(name).and_then(|v| v.as_str()) {
                    response.insert_header((name, val_str));
                }
            }

            response.body(spin_resp.body().to_vec())
        }
    }

    async fn handle_all(req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let spin_req = match adapter::actix_to_spin_request(&req, body) {
            Ok(r) => r,
            Err(_) => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "Invalid request"}))
            }
        };

        adapter::spin_to_actix_response(chirp::route(store(), spin_req))
    }

    pub async fn run() -> std::io::Result<()> {
        let addr =
            std::env::var("CHIRP_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

        if let Err(err) = db::init_demo_data(store()) {
            log::warn!("demo data init failed: {}", err);
        }

        log::info!("dev server listening on http://{}", addr);

        HttpServer::new(|| App::new().default_service(web::route().to(handle_all)))
            .bind(&addr)?
            .run()
            .await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
