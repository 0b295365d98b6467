use crate::{
    model::person::{NewPerson, Person},
    store::identity::IdentityStore,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct RegisteredPerson {
    pub person: Person,
    /// Exact text to embed in the person's QR code.
    #[schema(example = "6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94")]
    pub qr_payload: String,
}

/// Register a person
#[utoipa::path(
    post,
    path = "/persons",
    request_body = NewPerson,
    responses(
        (status = 201, description = "Person registered", body = RegisteredPerson),
        (status = 400, description = "Empty name or unrecognized role", body = Object, example = json!({
            "message": "Invalid input: unrecognized role: \"Principal\""
        })),
        (status = 503, description = "Storage unavailable")
    ),
    tag = "Person"
)]
pub async fn register_person(
    identities: web::Data<IdentityStore>,
    payload: web::Json<NewPerson>,
) -> actix_web::Result<impl Responder> {
    let person = identities.register(payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(RegisteredPerson {
        qr_payload: person.identity_token.clone(),
        person,
    }))
}

/// Get person by identity token
#[utoipa::path(
    get,
    path = "/persons/{identity_token}",
    params(
        ("identity_token", Path, description = "Identity token")
    ),
    responses(
        (status = 200, description = "Person found", body = Person),
        (status = 404, description = "Person not found", body = Object, example = json!({
            "message": "Unknown identity"
        }))
    ),
    tag = "Person"
)]
pub async fn get_person(
    identities: web::Data<IdentityStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let person = identities.lookup(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(person))
}

/// Delete person and their attendance records
#[utoipa::path(
    delete,
    path = "/persons/{identity_token}",
    params(
        ("identity_token", Path, description = "Identity token")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Person not found", body = Object, example = json!({
            "message": "Unknown identity"
        }))
    ),
    tag = "Person"
)]
pub async fn delete_person(
    identities: web::Data<IdentityStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    identities.delete(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
