use salvo::{Router, handler};

#[handler]
async fn hello() -> &'static str {
    "OK"
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(hello)
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use salvo::test::{ResponseExt, TestClient};

    use super::*;

    #[test_log::test(tokio::test)]
    async fn answers_ok() {
        let mut resp = TestClient::get("http://127.0.0.1:5800/healthcheck")
            .send(routes())
            .await;

        assert_eq!(resp.status_code, Some(StatusCode::OK));
        assert_eq!(resp.take_string().await.unwrap(), "OK");
    }
}
