use anyhow::Result;

use campus_api::auth::{decode_jwt, generate_jwt, hash_password, verify_password, Claims};
use campus_api::models::Role;
use uuid::Uuid;

// Session resolution is fail-closed: the only way to obtain a role is a
// validly signed token carrying one.

#[test]
fn token_round_trip_carries_identity_and_role() -> Result<()> {
    let id = Uuid::new_v4();
    let claims = Claims::new(
        id,
        "asmith".to_string(),
        Role::Teacher,
        "Alice".to_string(),
        "Smith".to_string(),
    );
    let token = generate_jwt(&claims)?;
    let decoded = decode_jwt(&token)?;

    assert_eq!(decoded.sub, id);
    assert_eq!(decoded.role, Role::Teacher);
    assert_eq!(decoded.username, "asmith");
    assert_eq!(decoded.surname, "Smith");
    Ok(())
}

#[test]
fn garbage_tokens_never_resolve_to_a_role() {
    assert!(decode_jwt("").is_err());
    assert!(decode_jwt("not-a-jwt").is_err());
    assert!(decode_jwt("eyJhbGciOiJIUzI1NiJ9.e30.").is_err());
}

#[test]
fn token_signed_with_another_secret_is_rejected() -> Result<()> {
    let claims = Claims::new(
        Uuid::new_v4(),
        "admin".to_string(),
        Role::Admin,
        "Ada".to_string(),
        "Lovelace".to_string(),
    );
    let token = generate_jwt(&claims)?;

    // Flip a character in the signature segment.
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    assert_eq!(parts.len(), 3);
    let sig = parts[2].clone();
    let flipped = if sig.starts_with('A') { "B" } else { "A" };
    parts[2] = format!("{}{}", flipped, &sig[1..]);
    assert!(decode_jwt(&parts.join(".")).is_err());
    Ok(())
}

#[test]
fn password_hashes_are_salted_and_verifiable() -> Result<()> {
    let first = hash_password("hunter2hunter2")?;
    let second = hash_password("hunter2hunter2")?;

    assert_ne!(first, second);
    assert!(verify_password("hunter2hunter2", &first)?);
    assert!(verify_password("hunter2hunter2", &second)?);
    assert!(!verify_password("hunter3hunter3", &first)?);
    Ok(())
}
