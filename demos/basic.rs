//! Minimal plume example: JSON endpoints, a redirect, and a file download.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:5000/users/42
//!   curl -X POST http://localhost:5000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:5000/users/42
//!   curl -i http://localhost:5000/old-users
//!   curl -OJ http://localhost:5000/manifest

use plume::{App, Error, Request, Response, Status};
use serde_json::json;

fn main() -> Result<(), Error> {
    App::new()
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .delete("/users/{id}", delete_user)
        .get("/old-users", |_req, res| -> Result<(), Error> {
            res.redirect("/users/1")?;
            Ok(())
        })
        .get("/manifest", |_req, res| -> Result<(), Error> {
            res.download("Cargo.toml", Some("plume-manifest.toml"))?;
            Ok(())
        })
        .listen_default()
}

// GET /users/{id}
fn get_user(req: &Request, res: &mut Response) {
    if !req.accepts("json") {
        res.send_status(Status::NotAcceptable.code());
        return;
    }
    let id = req.param("id").unwrap_or("unknown");
    res.send(json!({"id": id, "name": "alice", "from": req.ip()}));
}

// POST /users
fn create_user(req: &Request, res: &mut Response) -> Result<(), Error> {
    if req.raw_body().is_empty() {
        res.send_status(Status::BadRequest.code());
        return Ok(());
    }

    let input: serde_json::Value = req.json()?;
    res.status(Status::Created.code())
        .set_header([("Location", "/users/99")])?
        .json(&json!({"id": "99", "name": input["name"]}))?;
    Ok(())
}

// DELETE /users/{id} → 204 No Content
fn delete_user(_req: &Request, res: &mut Response) {
    res.status(Status::NoContent.code());
}
