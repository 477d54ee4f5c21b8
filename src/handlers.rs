//! Book catalog handlers served by the binary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::dispatch::{
    Args, HandlerFault, MethodDescriptor, ParamDescriptor, ParamType, PayloadType,
    RegistrationError, ScalarType,
};
use crate::routing::Router;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// In-memory catalog; shared by every dispatch, so guarded by a lock
#[derive(Debug, Default)]
pub struct Catalog {
    books: RwLock<BTreeMap<i64, Book>>,
}

impl Catalog {
    pub fn list(&self, ids: Option<&[i64]>) -> Result<Vec<Book>, HandlerFault> {
        let books = self.books.read().map_err(|_| "catalog lock poisoned")?;
        Ok(match ids {
            Some(ids) => ids.iter().filter_map(|id| books.get(id).cloned()).collect(),
            None => books.values().cloned().collect(),
        })
    }

    pub fn get(&self, id: i64) -> Result<Book, HandlerFault> {
        let books = self.books.read().map_err(|_| "catalog lock poisoned")?;
        books
            .get(&id)
            .cloned()
            .ok_or_else(|| format!("Book {id} not found").into())
    }

    pub fn create(&self, book: Book) -> Result<Book, HandlerFault> {
        let mut books = self.books.write().map_err(|_| "catalog lock poisoned")?;
        if books.contains_key(&book.id) {
            return Err(format!("Book {} already exists", book.id).into());
        }
        books.insert(book.id, book.clone());
        Ok(book)
    }

    pub fn update(&self, book: Book) -> Result<Book, HandlerFault> {
        let mut books = self.books.write().map_err(|_| "catalog lock poisoned")?;
        match books.get_mut(&book.id) {
            Some(existing) => {
                existing.clone_from(&book);
                Ok(book)
            }
            None => Err(format!("Book {} not found", book.id).into()),
        }
    }

    pub fn delete(&self, id: i64) -> Result<Book, HandlerFault> {
        let mut books = self.books.write().map_err(|_| "catalog lock poisoned")?;
        books
            .remove(&id)
            .ok_or_else(|| format!("Book {id} not found").into())
    }
}

fn id_param() -> Vec<ParamDescriptor> {
    vec![ParamDescriptor::required("id", ParamType::Scalar(ScalarType::I64))]
}

fn book_param() -> Vec<ParamDescriptor> {
    vec![ParamDescriptor::required(
        "book",
        ParamType::Payload(PayloadType::of::<Book>()),
    )]
}

/// Register the catalog routes plus `/greet`
pub fn register(router: &mut Router, catalog: &Arc<Catalog>) -> Result<(), RegistrationError> {
    let c = Arc::clone(catalog);
    router.register(
        "/books",
        MethodDescriptor::new(
            "list_books",
            vec![ParamDescriptor::optional("ids", ParamType::Array(ScalarType::I64))],
        )
        .returning::<Vec<Book>>(),
        move |mut args: Args| {
            let ids: Option<Vec<i64>> = args.take(0)?;
            c.list(ids.as_deref())
        },
    )?;

    // GET reads, DELETE removes; both take `id` from the query string
    let c = Arc::clone(catalog);
    router.register(
        "/book",
        MethodDescriptor::new("find_book", id_param()).returning::<Book>(),
        move |mut args: Args| c.get(args.take(0)?),
    )?;

    let c = Arc::clone(catalog);
    router.register(
        "/book/delete",
        MethodDescriptor::new("delete_book", id_param()).returning::<Book>(),
        move |mut args: Args| c.delete(args.take(0)?),
    )?;

    let c = Arc::clone(catalog);
    router.register(
        "/book/create",
        MethodDescriptor::new("create_book", book_param()).returning::<Book>(),
        move |mut args: Args| c.create(args.payload(0)?),
    )?;

    let c = Arc::clone(catalog);
    router.register(
        "/book/update",
        MethodDescriptor::new("update_book", book_param()).returning::<Book>(),
        move |mut args: Args| c.update(args.payload(0)?),
    )?;

    router.register(
        "/greet",
        MethodDescriptor::new(
            "greet",
            vec![
                ParamDescriptor::required("name", ParamType::Scalar(ScalarType::Text))
                    .with_default("guest"),
                ParamDescriptor::optional("age", ParamType::Scalar(ScalarType::I32)),
            ],
        ),
        greet,
    )
}

fn greet(mut args: Args) -> Result<serde_json::Value, HandlerFault> {
    let name: String = args.take(0)?;
    let age: Option<i32> = args.take(1)?;
    let message = match age {
        Some(age) => format!("Hello, {name} ({age})"),
        None => format!("Hello, {name}"),
    };
    Ok(serde_json::json!({ "message": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::LogSink;
    use crate::request::DispatchRequest;
    use crate::response::ResponseEnvelope;
    use hyper::body::Bytes;
    use hyper::Method;

    struct Quiet;

    impl LogSink for Quiet {
        fn log_failure(&self, _message: &str) {}
    }

    fn router() -> Router {
        let mut router = Router::new(Arc::new(Quiet));
        register(&mut router, &Arc::new(Catalog::default())).unwrap();
        router
    }

    fn send(router: &Router, method: Method, uri: &str, body: &str) -> ResponseEnvelope {
        let request = DispatchRequest::new(method, &uri.parse().unwrap()).with_body(
            Some("application/json".to_string()),
            Bytes::from(body.to_string()),
        );
        router.route(&request)
    }

    #[test]
    fn test_catalog_lifecycle() {
        let router = router();

        let created = send(&router, Method::POST, "/book/create", r#"{"id":1,"title":"Dune"}"#);
        assert_eq!(
            created,
            ResponseEnvelope::Success(serde_json::json!({"id": 1, "title": "Dune", "author": null}))
        );
        send(&router, Method::POST, "/book/create", r#"{"id":2,"title":"Emma"}"#);

        let listed = send(&router, Method::GET, "/books?ids=2&ids=9", "");
        assert_eq!(
            listed,
            ResponseEnvelope::Success(serde_json::json!([{"id": 2, "title": "Emma", "author": null}]))
        );

        let updated = send(
            &router,
            Method::PUT,
            "/book/update",
            r#"{"id":1,"title":"Dune","author":"Herbert"}"#,
        );
        assert!(!updated.is_error());

        let found = send(&router, Method::GET, "/book?id=1", "");
        assert_eq!(
            found,
            ResponseEnvelope::Success(serde_json::json!({"id": 1, "title": "Dune", "author": "Herbert"}))
        );

        let deleted = send(&router, Method::DELETE, "/book/delete?id=1", "");
        assert!(!deleted.is_error());
        assert_eq!(
            send(&router, Method::GET, "/book?id=1", ""),
            ResponseEnvelope::error("Book 1 not found")
        );
    }

    #[test]
    fn test_duplicate_create_is_error() {
        let router = router();
        send(&router, Method::POST, "/book/create", r#"{"id":1,"title":"Dune"}"#);
        assert_eq!(
            send(&router, Method::POST, "/book/create", r#"{"id":1,"title":"Dune"}"#),
            ResponseEnvelope::error("Book 1 already exists")
        );
    }

    #[test]
    fn test_greet() {
        let router = router();
        assert_eq!(
            send(&router, Method::GET, "/greet", ""),
            ResponseEnvelope::Success(serde_json::json!({"message": "Hello, guest"}))
        );
        assert_eq!(
            send(&router, Method::GET, "/greet?name=alice&age=7&age=9", ""),
            ResponseEnvelope::Success(serde_json::json!({"message": "Hello, alice (7)"}))
        );
    }

    #[test]
    fn test_create_over_get_reports_unsupported_type() {
        let router = router();
        match send(&router, Method::GET, "/book/create", "") {
            ResponseEnvelope::Error(body) => {
                assert_eq!(body.code, 500);
                assert!(body.message.starts_with("Parameter 'book' of type"), "{}", body.message);
            }
            other => panic!("expected error envelope, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_id() {
        let router = router();
        assert_eq!(
            send(&router, Method::GET, "/book", ""),
            ResponseEnvelope::error("Required parameter 'id' is not present.")
        );
    }
}
