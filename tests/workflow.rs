//! End-to-end approval workflow: institution onboarding, card submission,
//! moderation, catalog visibility, and re-approval after edits.

use policard::db;
use policard::error::AppError;
use policard::models::card::{CardCategory, CardInput};
use policard::models::institution::Institution;
use policard::models::request::{ModerationRequest, RequestStatus, Subject};
use policard::services::catalog;
use policard::services::listings;
use policard::services::moderation::{self, Decision};
use policard::services::registration::{self, RegistrationInput};

fn test_bank_registration() -> RegistrationInput {
    RegistrationInput {
        email: "contact@testbank.example".to_string(),
        password: "secret-pw".to_string(),
        confirm_password: "secret-pw".to_string(),
        contact_name: "Ana Torres".to_string(),
        institution_name: "Test Bank".to_string(),
        phone: "555-0100".to_string(),
        website: Some("https://testbank.example".to_string()),
        description: Some("A bank for tests".to_string()),
        logo_url: None,
    }
}

fn card_a() -> CardInput {
    CardInput {
        name: "Card A".to_string(),
        category: CardCategory::Student,
        cat_pct: 25.5,
        annual_fee: 0.0,
        min_age: 18,
        benefits: Some("No annual fee".to_string()),
        image_url: None,
    }
}

#[tokio::test]
async fn full_moderation_lifecycle() {
    let pool = db::in_memory_pool().await.unwrap();

    // Register "Test Bank"; it starts unapproved with one pending request.
    let (_, institution, reg_request) =
        registration::register_institution(&pool, test_bank_registration())
            .await
            .unwrap();
    assert!(!institution.approved);
    assert_eq!(reg_request.status, RequestStatus::Pending);

    // An unapproved institution cannot submit cards.
    let blocked = listings::submit_card(&pool, institution.id, card_a()).await;
    assert!(matches!(blocked, Err(AppError::NotApproved)));

    // Approve the institution.
    moderation::resolve_request(&pool, reg_request.id, Decision::Approved, None)
        .await
        .unwrap();
    let institution = Institution::find_by_id(&pool, institution.id)
        .await
        .unwrap()
        .unwrap();
    assert!(institution.approved);

    // Now the submission goes through: card unapproved, request pending.
    let (card, card_request) = listings::submit_card(&pool, institution.id, card_a())
        .await
        .unwrap();
    assert!(!card.approved);
    assert_eq!(card_request.status, RequestStatus::Pending);

    // Not in the catalog until approved.
    assert!(catalog::list_approved_cards(&pool).await.unwrap().is_empty());

    // Approve the card; it becomes visible and searchable.
    let resolved = moderation::resolve_request(&pool, card_request.id, Decision::Approved, None)
        .await
        .unwrap();
    assert!(resolved.responded_at.unwrap() >= resolved.submitted_at);

    let listed = catalog::list_approved_cards(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Card A");

    let found = catalog::search_cards(&pool, 20, CardCategory::Student)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, card.id);

    // Edit the fee: approval drops immediately and a fresh request opens.
    let mut edited = card_a();
    edited.annual_fee = 100.0;
    let (card, reopened) = listings::edit_card(&pool, institution.id, card.id, edited)
        .await
        .unwrap();
    assert!(!card.approved);
    assert_eq!(reopened.status, RequestStatus::Pending);
    assert_ne!(reopened.id, card_request.id);

    // The card left the catalog again.
    assert!(catalog::list_approved_cards(&pool).await.unwrap().is_empty());
    assert!(catalog::search_cards(&pool, 20, CardCategory::Student)
        .await
        .unwrap()
        .is_empty());

    // Two requests for the card in total: the approved one and the new
    // pending one. The workflow never stacks multiple open requests.
    let history = ModerationRequest::list_for_subject(&pool, Subject::Card(card.id))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, RequestStatus::Approved);
    assert_eq!(history[1].status, RequestStatus::Pending);

    // Every approved card traces back to an approved request for it.
    for approved_card in catalog::list_approved_cards(&pool).await.unwrap() {
        let requests =
            ModerationRequest::list_for_subject(&pool, Subject::Card(approved_card.id))
                .await
                .unwrap();
        assert!(requests.iter().any(|r| r.status == RequestStatus::Approved));
    }
}
