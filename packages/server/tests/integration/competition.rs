use chrono::{Duration, Utc};
use contenthub_server::entity::competition;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{Value, json};

use crate::common::{TestApp, routes};

fn competition_body(title: &str, max_participants: Option<i32>) -> Value {
    let now = Utc::now();
    json!({
        "title": title,
        "description": "Show us your best photo",
        "rules": "One entry per person",
        "prizes": [{"position": "1st", "description": "A camera"}],
        "startDate": (now + Duration::days(7)).to_rfc3339(),
        "endDate": (now + Duration::days(14)).to_rfc3339(),
        "registrationDeadline": (now + Duration::days(6)).to_rfc3339(),
        "maxParticipants": max_participants,
        "category": "photography",
        "customFields": [
            {"fieldName": "camera", "fieldType": "text", "required": true},
            {"fieldName": "age", "fieldType": "number"},
            {"fieldName": "pro", "fieldType": "boolean"},
        ],
    })
}

fn valid_answers() -> Value {
    json!({"answers": {"camera": "Leica", "age": 31, "pro": false}})
}

async fn move_deadline_to_past(app: &TestApp, id: i32) {
    let model = competition::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("competition row");
    let mut active: competition::ActiveModel = model.into();
    active.registration_deadline = Set(Utc::now() - Duration::hours(1));
    active.update(&app.db).await.unwrap();
}

mod management {
    use super::*;

    #[tokio::test]
    async fn admin_creates_competition() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;

        let res = app
            .post_with_token(routes::COMPETITIONS, &competition_body("Photo", Some(10)), &admin.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let competition = &res.body["competition"];
        assert_eq!(competition["title"], "Photo");
        assert_eq!(competition["status"], "upcoming");
        assert_eq!(competition["maxParticipants"], 10);
        assert_eq!(competition["participantCount"], 0);
        assert_eq!(competition["creator"]["id"], admin.id);
        assert_eq!(competition["customFields"][0]["fieldName"], "camera");
        assert_eq!(competition["customFields"][1]["required"], false);
    }

    #[tokio::test]
    async fn regular_users_cannot_create() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("Alice", "user").await;

        let res = app
            .post_with_token(routes::COMPETITIONS, &competition_body("Photo", None), &alice.token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let mut body = competition_body("Backwards", None);
        body["endDate"] = json!((Utc::now() + Duration::days(1)).to_rfc3339());

        let res = app.post_with_token(routes::COMPETITIONS, &body, &admin.token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn duplicate_custom_field_names_are_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let mut body = competition_body("Dupes", None);
        body["customFields"] = json!([
            {"fieldName": "camera", "fieldType": "text"},
            {"fieldName": "camera", "fieldType": "number"},
        ]);

        let res = app.post_with_token(routes::COMPETITIONS, &body, &admin.token).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn list_is_public_and_carries_participant_counts() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;
        let mut later = competition_body("Later", None);
        later["startDate"] = json!((Utc::now() + Duration::days(8)).to_rfc3339());
        let later_id = app.create_competition(&admin.token, &later).await;
        app.post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;

        let res = app.get_without_token(routes::COMPETITIONS).await;

        assert_eq!(res.status, 200);
        let list = res.body["competitions"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["id"], later_id);
        assert_eq!(list[0]["participantCount"], 0);
        assert_eq!(list[1]["id"], id);
        assert_eq!(list[1]["participantCount"], 1);
        assert!(list[1].get("participants").is_none());

        let res = app
            .get_without_token(&format!("{}?status=completed", routes::COMPETITIONS))
            .await;
        assert_eq!(res.body["competitions"], json!([]));
    }

    #[tokio::test]
    async fn update_can_clear_capacity() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", Some(3)))
            .await;

        let res = app
            .put_with_token(
                &routes::competition(id),
                &json!({"maxParticipants": null, "status": "active"}),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["competition"]["maxParticipants"].is_null());
        assert_eq!(res.body["competition"]["status"], "active");
        assert_eq!(res.body["competition"]["title"], "Photo");
    }

    #[tokio::test]
    async fn update_rechecks_merged_schedule() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;

        let res = app
            .put_with_token(
                &routes::competition(id),
                &json!({"registrationDeadline": (Utc::now() + Duration::days(30)).to_rfc3339()}),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn regular_users_cannot_update_or_delete() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;

        let res = app
            .put_with_token(&routes::competition(id), &json!({"title": "Mine"}), &alice.token)
            .await;
        assert_eq!(res.status, 403);
        let res = app.delete_with_token(&routes::competition(id), &alice.token).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn delete_removes_competition_and_registrations() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;
        app.post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;

        let res = app.delete_with_token(&routes::competition(id), &admin.token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Competition deleted successfully");

        assert_eq!(app.get_without_token(&routes::competition(id)).await.status, 404);
    }
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn registers_once() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", Some(5)))
            .await;

        let res = app
            .post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Successfully registered for competition");
        assert_eq!(res.body["participant"]["userId"], alice.id);
        assert_eq!(res.body["participant"]["status"], "registered");
        assert_eq!(res.body["participant"]["answers"]["camera"], "Leica");

        let res = app
            .post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Already registered for this competition");

        let detail = app.get_without_token(&routes::competition(id)).await;
        assert_eq!(detail.body["competition"]["participantCount"], 1);
    }

    #[tokio::test]
    async fn full_competition_rejects_newcomers() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let bob = app.create_user("Bob", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Tiny", Some(1)))
            .await;

        app.post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;
        let res = app
            .post_with_token(&routes::competition_register(id), &valid_answers(), &bob.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Competition is full");
    }

    #[tokio::test]
    async fn deadline_is_reported_before_capacity() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let bob = app.create_user("Bob", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Closed", Some(1)))
            .await;
        app.post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;
        move_deadline_to_past(&app, id).await;

        let res = app
            .post_with_token(&routes::competition_register(id), &valid_answers(), &bob.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Registration deadline has passed");
    }

    #[tokio::test]
    async fn answers_must_match_custom_fields() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;

        let res = app
            .post_with_token(
                &routes::competition_register(id),
                &json!({"answers": {"age": 20}}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Missing answer for required field 'camera'");

        let res = app
            .post_with_token(
                &routes::competition_register(id),
                &json!({"answers": {"camera": "Nikon", "age": "thirty"}}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Answer for 'age' must be a number");

        let res = app
            .post_with_token(
                &routes::competition_register(id),
                &json!({"answers": {"camera": "Nikon", "shoe": "42"}}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn padded_field_names_are_stored_trimmed() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let mut body = competition_body("Teams", None);
        body["customFields"] = json!([
            {"fieldName": " teamName ", "fieldType": "text", "required": true},
        ]);
        let id = app.create_competition(&admin.token, &body).await;

        let detail = app.get_without_token(&routes::competition(id)).await;
        assert_eq!(
            detail.body["competition"]["customFields"][0]["fieldName"],
            "teamName"
        );

        let res = app
            .post_with_token(
                &routes::competition_register(id),
                &json!({"answers": {"teamName": "Owls"}}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["participant"]["answers"]["teamName"], "Owls");
    }

    #[tokio::test]
    async fn register_without_body_when_no_fields_required() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let mut body = competition_body("Open", None);
        body["customFields"] = json!([]);
        let id = app.create_competition(&admin.token, &body).await;

        let res = app
            .post_empty_with_token(&routes::competition_register(id), &alice.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["participant"]["answers"], json!({}));
    }

    #[tokio::test]
    async fn registering_for_missing_competition_is_404() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("Alice", "user").await;
        let res = app
            .post_with_token(&routes::competition_register(404), &valid_answers(), &alice.token)
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;
        let res = app
            .post_without_token(&routes::competition_register(1), &valid_answers())
            .await;
        assert_eq!(res.status, 401);
    }
}

mod detail {
    use super::*;

    #[tokio::test]
    async fn answers_are_visible_to_managers_and_the_participant_only() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let bob = app.create_user("Bob", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;
        app.post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;

        let res = app.get_with_token(&routes::competition(id), &admin.token).await;
        let participants = res.body["competition"]["participants"].as_array().unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0]["user"]["name"], "Alice");
        assert_eq!(participants[0]["answers"]["camera"], "Leica");
        assert_eq!(res.body["competition"]["registered"], false);

        let res = app.get_with_token(&routes::competition(id), &alice.token).await;
        assert_eq!(res.body["competition"]["registered"], true);
        assert_eq!(
            res.body["competition"]["participants"][0]["answers"]["camera"],
            "Leica"
        );

        let res = app.get_with_token(&routes::competition(id), &bob.token).await;
        assert_eq!(res.body["competition"]["registered"], false);
        assert!(res.body["competition"]["participants"][0].get("answers").is_none());

        let res = app.get_without_token(&routes::competition(id)).await;
        assert!(res.body["competition"].get("registered").is_none());
        assert!(res.body["competition"]["participants"][0].get("answers").is_none());
    }

    #[tokio::test]
    async fn manager_sets_participant_status() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let alice = app.create_user("Alice", "user").await;
        let id = app
            .create_competition(&admin.token, &competition_body("Photo", None))
            .await;
        app.post_with_token(&routes::competition_register(id), &valid_answers(), &alice.token)
            .await;

        let res = app
            .put_with_token(
                &routes::competition_participant(id, alice.id),
                &json!({"status": "winner"}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .put_with_token(
                &routes::competition_participant(id, alice.id),
                &json!({"status": "winner"}),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["participant"]["status"], "winner");

        let res = app
            .put_with_token(
                &routes::competition_participant(id, admin.id),
                &json!({"status": "winner"}),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["message"], "Participant not found");
    }
}
