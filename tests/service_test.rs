//! End-to-end tests of study workflows over in-memory SQLite.

use impact_rating::error::{AppError, StorageError, SurveyError};
use impact_rating::service::{ImpactService, ResponseSubmission};
use impact_rating::storage::{SqliteStorage, Storage, StudyIntake, StudyStatus};
use impact_rating::survey::{GeneratedSurvey, ResponseData};

async fn create_test_service() -> ImpactService<SqliteStorage> {
    let storage = SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage");
    ImpactService::new(storage)
}

fn intake() -> StudyIntake {
    serde_json::from_value(serde_json::json!({
        "impactStudyName": "Customer Service Excellence",
        "programName": "Service Mastery",
        "client": "Retail Co",
        "userRole": "L&D Manager",
        "programType": "Soft Skills",
        "sector": "Retail",
        "programStartDate": "2025-01-15",
        "programEndDate": "2025-03-15",
        "programReason": "Customer satisfaction scores dropped",
        "stakeholders": ["Team Members", "Managers"],
        "surveyQuestions": [
            {"level": "Level 1: Reaction", "question": "Was the program engaging?", "audience": "Participant", "type": "Rating Scale"},
            {"level": "Level 2: Learning", "question": "Can you apply the techniques?", "audience": "Participant", "type": "Rating Scale"},
            {"level": "Level 3: Behavior", "question": "Has their behavior changed?", "audience": "Manager", "type": "Rating Scale"},
            {"level": "Level 4: Results", "question": "Have CSAT scores improved?", "audience": "HR", "type": "Rating Scale"}
        ]
    }))
    .unwrap()
}

/// Create a study and share it, returning `(study_id, token)`.
async fn shared_study(service: &ImpactService<SqliteStorage>) -> (String, String) {
    let study = service.create_study(intake()).await.unwrap();
    let token = service.share_study(&study.id).await.unwrap();
    (study.id, token)
}

#[cfg(test)]
mod submission_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_submission_computes_rating() {
        let service = create_test_service().await;
        let (study_id, token) = shared_study(&service).await;

        let receipt = service
            .submit_response(
                &token,
                ResponseSubmission::new(ResponseData::from(["5", "4", "3", "2"])),
            )
            .await
            .unwrap();

        let metrics = receipt.metrics.expect("metrics should be recomputed");
        assert_eq!(metrics.rating.ir_metric, Some(6.4));
        assert_eq!(metrics.completion_percentage, None);

        let study = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(study.ir_metric, Some(6.4));
        assert!(study.insight.unwrap().starts_with("Moderate impact"));
        assert_eq!(study.completion_percentage, 0);
        assert_eq!(study.status, StudyStatus::InProgress);
    }

    #[tokio::test]
    async fn test_completion_tracks_invitations() {
        let service = create_test_service().await;
        let (study_id, token) = shared_study(&service).await;

        let mut invitations = Vec::new();
        for email in ["a@example.com", "b@example.com", "c@example.com", "d@example.com"] {
            invitations.push(service.invite(&study_id, email, None).await.unwrap());
        }

        for invitation in invitations.iter().take(3) {
            service
                .submit_response(
                    &token,
                    ResponseSubmission::new(ResponseData::from(["4", "4", "4", "4"]))
                        .with_invitation(&invitation.id),
                )
                .await
                .unwrap();
        }

        let study = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(study.completion_percentage, 75);
        assert_eq!(study.status, StudyStatus::InProgress);

        let stored = service.storage().get_invitations(&study_id).await.unwrap();
        assert_eq!(stored.iter().filter(|i| i.is_completed()).count(), 3);

        service
            .submit_response(
                &token,
                ResponseSubmission::new(ResponseData::from(["5", "5", "5", "5"]))
                    .with_invitation(&invitations[3].id),
            )
            .await
            .unwrap();

        let study = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(study.completion_percentage, 100);
        assert_eq!(study.status, StudyStatus::Completed);
    }

    #[tokio::test]
    async fn test_open_ended_answers_keep_previous_rating() {
        let service = create_test_service().await;
        let (study_id, token) = shared_study(&service).await;

        service
            .submit_response(&token, ResponseSubmission::new(ResponseData::from(["3"])))
            .await
            .unwrap();
        let before = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(before.ir_metric, Some(5.5));

        // Free text adds nothing numeric, so the score is unchanged
        let receipt = service
            .submit_response(
                &token,
                ResponseSubmission::new(ResponseData::from(["Loved it", "", "Hard to say"])),
            )
            .await
            .unwrap();
        assert_eq!(receipt.metrics.unwrap().rating.ir_metric, Some(5.5));

        let after = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(after.ir_metric, Some(5.5));
        assert_eq!(after.insight, before.insight);
    }

    #[tokio::test]
    async fn test_submission_with_foreign_invitation_rejected() {
        let service = create_test_service().await;
        let (_, token) = shared_study(&service).await;
        let (other_study, _) = shared_study(&service).await;
        let foreign = service
            .invite(&other_study, "x@example.com", None)
            .await
            .unwrap();

        let result = service
            .submit_response(
                &token,
                ResponseSubmission::new(ResponseData::from(["5"])).with_invitation(&foreign.id),
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::Storage(StorageError::InvitationNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_submission_to_study_without_questions_rejected() {
        let service = create_test_service().await;
        let mut bare = intake();
        bare.survey_questions.clear();
        let study = service.create_study(bare).await.unwrap();
        let token = service.share_study(&study.id).await.unwrap();

        let result = service
            .submit_response(&token, ResponseSubmission::new(ResponseData::from(["5"])))
            .await;

        assert!(matches!(
            result,
            Err(AppError::Survey(SurveyError::EmptyQuestions { .. }))
        ));
        assert_eq!(service.storage().get_response_count(&study.id).await.unwrap(), 0);
    }
}

#[cfg(test)]
mod study_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_share_unknown_study() {
        let service = create_test_service().await;

        let result = service.share_study("missing").await;

        assert!(matches!(
            result,
            Err(AppError::Storage(StorageError::StudyNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invite_unknown_study() {
        let service = create_test_service().await;

        let result = service.invite("missing", "a@example.com", None).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_import_survey_replaces_questions() {
        let service = create_test_service().await;
        let study = service.create_study(intake()).await.unwrap();

        let survey = GeneratedSurvey::from_completion(
            r#"{
                "questions": [
                    {"level": "Level 2: Learning", "question": "Rate your confidence", "audience": "Participant", "type": "Rating Scale"},
                    {"level": "Level 4: Results", "question": "Did retention improve?", "audience": "HR", "type": "Rating Scale"}
                ],
                "sampleSize": {"recommended": 25, "explanation": "Cohort of 80"}
            }"#,
        )
        .unwrap();

        let updated = service.import_survey(&study.id, survey).await.unwrap();
        assert_eq!(updated.survey_questions.len(), 2);

        let stored = service.storage().get_study(&study.id).await.unwrap().unwrap();
        assert_eq!(stored.survey_questions, updated.survey_questions);
        assert_eq!(stored.sample_size.map(|s| s.recommended), Some(25));
    }

    #[tokio::test]
    async fn test_import_survey_rescores_existing_responses() {
        let service = create_test_service().await;
        let (study_id, token) = shared_study(&service).await;

        service
            .submit_response(
                &token,
                ResponseSubmission::new(ResponseData::from(["5", "4", "3", "2"])),
            )
            .await
            .unwrap();
        let before = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(before.ir_metric, Some(6.4));

        let survey = GeneratedSurvey::from_completion(
            r#"{
                "questions": [
                    {"level": "Level 4: Results", "question": "Sales up?", "audience": "HR", "type": "Rating Scale"},
                    {"level": "Level 4: Results", "question": "Returns down?", "audience": "HR", "type": "Rating Scale"},
                    {"level": "Level 4: Results", "question": "CSAT up?", "audience": "HR", "type": "Rating Scale"},
                    {"level": "Level 4: Results", "question": "NPS up?", "audience": "HR", "type": "Rating Scale"}
                ]
            }"#,
        )
        .unwrap();

        // All four answers now sit on L4: mean 3.5 -> 0.625 * 9 + 1 = 6.625 -> 6.6
        let updated = service.import_survey(&study_id, survey).await.unwrap();
        assert_eq!(updated.ir_metric, Some(6.6));

        let stored = service.storage().get_study(&study_id).await.unwrap().unwrap();
        assert_eq!(stored.ir_metric, Some(6.6));
    }

    #[tokio::test]
    async fn test_recompute_unknown_study() {
        let service = create_test_service().await;

        assert!(service.recompute_study("missing").await.is_err());
    }
}

#[cfg(test)]
mod portfolio_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_portfolio_over_rated_and_unrated_studies() {
        let service = create_test_service().await;

        let (_, first_token) = shared_study(&service).await;
        let (_, second_token) = shared_study(&service).await;
        service.create_study(intake()).await.unwrap();

        // 6.4
        service
            .submit_response(
                &first_token,
                ResponseSubmission::new(ResponseData::from(["5", "4", "3", "2"])),
            )
            .await
            .unwrap();
        // 10.0
        service
            .submit_response(
                &second_token,
                ResponseSubmission::new(ResponseData::from(["5", "5", "5", "5"])),
            )
            .await
            .unwrap();

        let summary = service.portfolio().await.unwrap();
        assert_eq!(summary.study_count, 3);
        assert_eq!(summary.rated_count, 2);
        assert_eq!(summary.average_ir, Some(8.2));
        assert_eq!(summary.min_ir, Some(6.4));
        assert_eq!(summary.max_ir, Some(10.0));
        assert_eq!(summary.themes.len(), 2);
    }
}
