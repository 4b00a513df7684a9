use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use sqlx::{SqlitePool, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    CoreError, CoreResult,
    identity::Role,
    requests::{MeetingMethod, TimeSlot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentorField {
    CareerEmployment,
    AcademicsStudy,
    EntrepreneurshipLeadership,
    SelfDevelopmentHobbies,
    VolunteeringSocial,
    EmotionalCounseling,
    InvestmentFinance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingFrequency {
    OneTime,
    Monthly,
    LongTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailableDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationStyle {
    DirectClear,
    SoftSupportive,
    HorizontalComfortable,
    ExperienceGuide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentoringFocus {
    PracticeOriented,
    AdviceCounseling,
    InsightInspiration,
}

/// One completed seven-step survey. Retakes insert a new row; the latest
/// row per user is the one that matters.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MatchingSurvey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fields: Json<Vec<MentorField>>,
    pub frequency: MeetingFrequency,
    pub goal: String,
    pub available_days: Json<Vec<AvailableDay>>,
    pub time_slots: Json<Vec<TimeSlot>>,
    pub methods: Json<Vec<MeetingMethod>>,
    pub communication_styles: Json<Vec<CommunicationStyle>>,
    pub mentoring_focuses: Json<Vec<MentoringFocus>>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyAnswers {
    pub fields: Vec<MentorField>,
    pub frequency: MeetingFrequency,
    pub goal: String,
    pub available_days: Vec<AvailableDay>,
    pub time_slots: Vec<TimeSlot>,
    pub methods: Vec<MeetingMethod>,
    pub communication_styles: Vec<CommunicationStyle>,
    pub mentoring_focuses: Vec<MentoringFocus>,
}

/// Per-dimension scores, each 0.0 to 1.0.
#[derive(Debug, Clone, Serialize)]
pub struct MatchBreakdown {
    pub fields: f64,
    pub frequency: f64,
    pub available_days: f64,
    pub time_slots: f64,
    pub methods: f64,
    pub communication_styles: f64,
    pub mentoring_focuses: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorRecommendation {
    pub mentor_id: Uuid,
    pub name: String,
    pub match_score: f64,
    pub score_breakdown: MatchBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationPage {
    pub recommendations: Vec<MentorRecommendation>,
    pub total: i64,
}

const SURVEY_COLUMNS: &str = "id, user_id, fields, frequency, goal, available_days, \
    time_slots, methods, communication_styles, mentoring_focuses, created_at";

/// Survey store plus the weighted scoring that ranks mentors for a mentee.
/// Read-side ranking is recomputed per query from committed surveys.
#[derive(Clone)]
pub struct MentorMatching {
    db: SqlitePool,
}

impl MentorMatching {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn submit_survey(
        &self,
        user_id: Uuid,
        answers: SurveyAnswers,
    ) -> CoreResult<MatchingSurvey> {
        validate(&answers)?;

        let survey = MatchingSurvey {
            id: Uuid::now_v7(),
            user_id,
            fields: Json(answers.fields),
            frequency: answers.frequency,
            goal: answers.goal,
            available_days: Json(answers.available_days),
            time_slots: Json(answers.time_slots),
            methods: Json(answers.methods),
            communication_styles: Json(answers.communication_styles),
            mentoring_focuses: Json(answers.mentoring_focuses),
            created_at: OffsetDateTime::now_utc(),
        };

        sqlx::query(
            "INSERT INTO matching_surveys \
             (id,user_id,fields,frequency,goal,available_days,time_slots,methods,\
              communication_styles,mentoring_focuses,created_at) \
             VALUES (?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(survey.id)
        .bind(survey.user_id)
        .bind(&survey.fields)
        .bind(survey.frequency)
        .bind(&survey.goal)
        .bind(&survey.available_days)
        .bind(&survey.time_slots)
        .bind(&survey.methods)
        .bind(&survey.communication_styles)
        .bind(&survey.mentoring_focuses)
        .bind(survey.created_at)
        .execute(&self.db)
        .await?;

        tracing::info!(user = %user_id, survey = %survey.id, "matching survey recorded");
        Ok(survey)
    }

    pub async fn latest_survey(&self, user_id: Uuid) -> CoreResult<MatchingSurvey> {
        let survey = sqlx::query_as(&format!(
            "SELECT {SURVEY_COLUMNS} FROM matching_surveys WHERE user_id=? \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        survey.ok_or(CoreError::NotFound("matching survey"))
    }

    /// Mentors ranked by weighted survey overlap with the caller's latest
    /// survey. Mentors without a survey are not ranked at all; `total`
    /// counts the ranked set before pagination.
    pub async fn recommendations(
        &self,
        mentee_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> CoreResult<RecommendationPage> {
        let mentee = self.latest_survey(mentee_id).await?;

        let mentors: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM users WHERE role=? AND id != ?")
                .bind(Role::Mentor)
                .bind(mentee_id)
                .fetch_all(&self.db)
                .await?;
        let names: HashMap<Uuid, String> = mentors.into_iter().collect();

        let surveys: Vec<MatchingSurvey> = sqlx::query_as(
            "SELECT s.id, s.user_id, s.fields, s.frequency, s.goal, s.available_days, \
                    s.time_slots, s.methods, s.communication_styles, s.mentoring_focuses, \
                    s.created_at \
             FROM matching_surveys s JOIN users u ON u.id = s.user_id \
             WHERE u.role=? AND u.id != ? \
             ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(Role::Mentor)
        .bind(mentee_id)
        .fetch_all(&self.db)
        .await?;

        // Newest-first, so the first survey seen per mentor is their latest.
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut cards: Vec<MentorRecommendation> = Vec::new();
        for survey in surveys {
            if !seen.insert(survey.user_id) {
                continue;
            }
            let (score, breakdown) = match_score(&mentee, &survey);
            cards.push(MentorRecommendation {
                mentor_id: survey.user_id,
                name: names
                    .get(&survey.user_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_owned()),
                match_score: score,
                score_breakdown: breakdown,
            });
        }

        cards.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));

        let total = cards.len() as i64;
        let offset = offset.max(0) as usize;
        let limit = limit.clamp(1, 50) as usize;
        let recommendations = cards.into_iter().skip(offset).take(limit).collect();

        Ok(RecommendationPage {
            recommendations,
            total,
        })
    }
}

fn validate(answers: &SurveyAnswers) -> CoreResult<()> {
    if answers.goal.trim().is_empty() || answers.goal.chars().count() > 1000 {
        return Err(CoreError::Validation(
            "goal must be between 1 and 1000 characters".to_owned(),
        ));
    }

    let steps = [
        ("fields", answers.fields.is_empty()),
        ("available_days", answers.available_days.is_empty()),
        ("time_slots", answers.time_slots.is_empty()),
        ("methods", answers.methods.is_empty()),
        ("communication_styles", answers.communication_styles.is_empty()),
        ("mentoring_focuses", answers.mentoring_focuses.is_empty()),
    ];
    for (step, empty) in steps {
        if empty {
            return Err(CoreError::Validation(format!(
                "{step} needs at least one answer"
            )));
        }
    }

    Ok(())
}

/// Weighted overlap between a mentee survey and a mentor survey. Fields use
/// Jaccard similarity (symmetric), frequency is an exact match, methods treat
/// FLEXIBLE as a wildcard, and the remaining dimensions score how much of the
/// mentee's wishes the mentor covers.
pub fn match_score(mentee: &MatchingSurvey, mentor: &MatchingSurvey) -> (f64, MatchBreakdown) {
    let breakdown = MatchBreakdown {
        fields: round4(jaccard(&mentee.fields, &mentor.fields)),
        frequency: if mentee.frequency == mentor.frequency {
            1.0
        } else {
            0.0
        },
        available_days: round4(coverage(&mentee.available_days, &mentor.available_days)),
        time_slots: round4(coverage(&mentee.time_slots, &mentor.time_slots)),
        methods: methods_overlap(&mentee.methods, &mentor.methods),
        communication_styles: round4(coverage(
            &mentee.communication_styles,
            &mentor.communication_styles,
        )),
        mentoring_focuses: round4(coverage(&mentee.mentoring_focuses, &mentor.mentoring_focuses)),
    };

    let total = round4(
        0.25 * breakdown.fields
            + 0.10 * breakdown.frequency
            + 0.15 * breakdown.available_days
            + 0.15 * breakdown.time_slots
            + 0.10 * breakdown.methods
            + 0.15 * breakdown.communication_styles
            + 0.10 * breakdown.mentoring_focuses,
    );

    (total, breakdown)
}

fn jaccard<T: Copy + Eq + Hash>(a: &[T], b: &[T]) -> f64 {
    let a: HashSet<T> = a.iter().copied().collect();
    let b: HashSet<T> = b.iter().copied().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Fraction of the mentee's answers the mentor also picked.
fn coverage<T: Copy + Eq + Hash>(wanted: &[T], offered: &[T]) -> f64 {
    let wanted: HashSet<T> = wanted.iter().copied().collect();
    if wanted.is_empty() {
        return 0.0;
    }
    let offered: HashSet<T> = offered.iter().copied().collect();
    wanted.intersection(&offered).count() as f64 / wanted.len() as f64
}

fn methods_overlap(mentee: &[MeetingMethod], mentor: &[MeetingMethod]) -> f64 {
    if mentee.contains(&MeetingMethod::Flexible) || mentor.contains(&MeetingMethod::Flexible) {
        return 1.0;
    }
    if mentee.iter().any(|m| mentor.contains(m)) {
        1.0
    } else {
        0.0
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(
        fields: Vec<MentorField>,
        frequency: MeetingFrequency,
        days: Vec<AvailableDay>,
        slots: Vec<TimeSlot>,
        methods: Vec<MeetingMethod>,
        styles: Vec<CommunicationStyle>,
        focuses: Vec<MentoringFocus>,
    ) -> MatchingSurvey {
        MatchingSurvey {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            fields: Json(fields),
            frequency,
            goal: "grow".to_owned(),
            available_days: Json(days),
            time_slots: Json(slots),
            methods: Json(methods),
            communication_styles: Json(styles),
            mentoring_focuses: Json(focuses),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn career_monthly() -> MatchingSurvey {
        survey(
            vec![MentorField::CareerEmployment],
            MeetingFrequency::Monthly,
            vec![AvailableDay::Mon, AvailableDay::Wed],
            vec![TimeSlot::Evening],
            vec![MeetingMethod::Online],
            vec![CommunicationStyle::DirectClear],
            vec![MentoringFocus::PracticeOriented],
        )
    }

    #[test]
    fn identical_surveys_score_one() {
        let mentee = career_monthly();
        let mentor = career_monthly();
        let (total, breakdown) = match_score(&mentee, &mentor);
        assert!((total - 1.0).abs() < 1e-9);
        assert!((breakdown.fields - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_surveys_score_zero() {
        let mentee = career_monthly();
        let mentor = survey(
            vec![MentorField::InvestmentFinance],
            MeetingFrequency::OneTime,
            vec![AvailableDay::Sun],
            vec![TimeSlot::Morning],
            vec![MeetingMethod::Offline],
            vec![CommunicationStyle::ExperienceGuide],
            vec![MentoringFocus::InsightInspiration],
        );
        let (total, _) = match_score(&mentee, &mentor);
        assert_eq!(total, 0.0);
    }

    #[test]
    fn flexible_method_acts_as_wildcard() {
        let mentee = career_monthly();
        let mut mentor = career_monthly();
        mentor.methods = Json(vec![MeetingMethod::Flexible]);
        let (_, breakdown) = match_score(&mentee, &mentor);
        assert_eq!(breakdown.methods, 1.0);
    }

    #[test]
    fn coverage_scores_the_mentees_side() {
        let mut mentee = career_monthly();
        mentee.available_days = Json(vec![AvailableDay::Mon, AvailableDay::Tue]);
        let mut mentor = career_monthly();
        mentor.available_days = Json(vec![
            AvailableDay::Mon,
            AvailableDay::Sat,
            AvailableDay::Sun,
        ]);
        let (_, breakdown) = match_score(&mentee, &mentor);
        assert!((breakdown.available_days - 0.5).abs() < 1e-9);
    }
}
