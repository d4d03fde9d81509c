use detour::error::BoxError;
use detour::http::layer::redirect::{
    AmbiguousDirective, REDIRECT_SEGMENTS_HEADER, REDIRECT_TARGET_HEADER, RedirectConfig,
    RedirectLayer, RedirectTargets, RequestRedirectExt,
};
use detour::http::{Body, Request, Response, Uri};
use detour::service::service_fn;
use detour::{Layer, Service};
use parking_lot::Mutex;
use std::sync::Arc;

/// A transport double recording the requests it was asked to send.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<(Uri, Vec<String>)>>>);

impl Recorder {
    fn transport(
        &self,
    ) -> impl Service<Request<Body>, Output = Response<Body>, Error = BoxError> + Clone {
        let seen = self.0.clone();
        service_fn(move |req: Request<Body>| {
            let seen = seen.clone();
            async move {
                let headers = req.headers().keys().map(|name| name.to_string()).collect();
                seen.lock().push((req.uri().clone(), headers));
                Ok::<_, BoxError>(Response::new(Body::from("ok")))
            }
        })
    }

    fn last_uri(&self) -> Uri {
        self.0.lock().last().unwrap().0.clone()
    }

    fn last_headers(&self) -> Vec<String> {
        self.0.lock().last().unwrap().1.clone()
    }

    fn count(&self) -> usize {
        self.0.lock().len()
    }
}

#[tokio::test]
async fn splice_example_from_header_directive() {
    let recorder = Recorder::default();
    let targets = RedirectTargets::new();
    targets
        .put("foo", "https://example.com/test1/list/")
        .unwrap();
    let client = RedirectLayer::new(targets).into_layer(recorder.transport());

    let req = Request::builder()
        .uri("https://api.example.org/user/sss")
        .header("Url-Redirect", "foo")
        .header("Url-PathSegmentsSize", "1")
        .header("accept", "application/json")
        .body(Body::empty())
        .unwrap();
    client.serve(req).await.unwrap();

    assert_eq!(recorder.last_uri(), "https://example.com/test1/list/sss");
    assert_eq!(recorder.last_headers(), ["accept"]);
}

#[tokio::test]
async fn zero_ignored_segments_prefixes_the_path() {
    let recorder = Recorder::default();
    let targets = RedirectTargets::new();
    targets
        .put("foo", "https://example.com/test1/list/")
        .unwrap();
    let client = RedirectLayer::new(targets).into_layer(recorder.transport());

    let req = Request::builder()
        .uri("https://api.example.org/user/sss?id=7")
        .with_redirect_target("foo")
        .with_redirect_segments(0)
        .body(Body::empty())
        .unwrap();
    client.serve(req).await.unwrap();

    assert_eq!(recorder.last_uri(), "https://example.com/test1/list/user/sss?id=7");
}

#[tokio::test]
async fn unknown_target_is_forwarded_without_directive_headers() {
    let recorder = Recorder::default();
    let client = RedirectLayer::new(RedirectTargets::new()).into_layer(recorder.transport());

    let req = Request::builder()
        .uri("https://api.example.org/user/sss")
        .header(REDIRECT_TARGET_HEADER, "nope")
        .header(REDIRECT_SEGMENTS_HEADER, "1")
        .body(Body::empty())
        .unwrap();
    client.serve(req).await.unwrap();

    assert_eq!(recorder.last_uri(), "https://api.example.org/user/sss");
    assert!(recorder.last_headers().is_empty());
}

#[tokio::test]
async fn ambiguous_directive_never_reaches_the_transport() {
    let recorder = Recorder::default();
    let targets = RedirectTargets::new();
    targets.put("foo", "https://example.com").unwrap();
    targets.put("bar", "https://example.net").unwrap();
    let client = RedirectLayer::new(targets).into_layer(recorder.transport());

    let req = Request::builder()
        .uri("https://api.example.org/user/sss")
        .header(REDIRECT_TARGET_HEADER, "foo")
        .header(REDIRECT_TARGET_HEADER, "bar")
        .body(Body::empty())
        .unwrap();
    let err = client.serve(req).await.unwrap_err();

    assert_eq!(
        err.downcast_ref::<AmbiguousDirective>().unwrap().targets(),
        ["foo", "bar"]
    );
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn layer_from_config() {
    let recorder = Recorder::default();
    let config = RedirectConfig::from_json(
        r#"{
            "targets": {
                "users": "http://users.internal:8080/api/v2/",
                "files": "https://cdn.example.com"
            },
            "default_ignore_segments": 1,
            "path_cache_capacity": 16
        }"#,
    )
    .unwrap();
    let layer = config.build().unwrap();
    let client = layer.layer(recorder.transport());

    let req = Request::builder()
        .uri("https://api.example.org/users/42/profile")
        .with_redirect_target("users")
        .body(Body::empty())
        .unwrap();
    client.serve(req).await.unwrap();
    assert_eq!(recorder.last_uri(), "http://users.internal:8080/api/v2/42/profile");

    let req = Request::builder()
        .uri("https://api.example.org/static/img/logo.png")
        .with_redirect_target("files")
        .with_redirect_segments(2)
        .body(Body::empty())
        .unwrap();
    client.serve(req).await.unwrap();
    assert_eq!(recorder.last_uri(), "https://cdn.example.com/logo.png");

    let stats = client.rewriter().cache_stats();
    assert_eq!((stats.hits, stats.misses), (0, 2));
}

#[tokio::test]
async fn concurrent_requests_and_target_updates() {
    let recorder = Recorder::default();
    let targets = RedirectTargets::new();
    targets.put("svc", "https://one.example.com/a/").unwrap();
    let client = Arc::new(RedirectLayer::new(targets.clone()).into_layer(recorder.transport()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            for j in 0..50 {
                let req = Request::builder()
                    .uri(format!("https://api.example.org/x/{i}/{j}"))
                    .with_redirect_target("svc")
                    .with_redirect_segments(1)
                    .body(Body::empty())
                    .unwrap();
                client.serve(req).await.unwrap();
            }
        }));
    }
    let updater = tokio::spawn(async move {
        for i in 0..100 {
            let target = if i % 2 == 0 {
                "http://two.example.com:8080/b"
            } else {
                "https://one.example.com/a/"
            };
            targets.put("svc", target).unwrap();
            tokio::task::yield_now().await;
        }
    });
    for handle in handles {
        handle.await.unwrap();
    }
    updater.await.unwrap();

    assert_eq!(recorder.count(), 400);
    for (uri, _) in recorder.0.lock().iter() {
        let authority = uri.authority().unwrap().as_str();
        match authority {
            "one.example.com" => assert!(uri.path().starts_with("/a/")),
            "two.example.com:8080" => assert!(uri.path().starts_with("/b/")),
            other => panic!("unexpected authority {other}"),
        }
    }
}
