// Sample data for local runs: two organizations, their members and a few
// months of past events with attendance

use chrono::{Duration, Utc};
use tracing::info;

use crate::{
    analytics::ParticipationRule,
    app_state::AppState,
    entities::{
        CreateEventRequest, CreateMemberRequest, CreateOrganizationRequest, EventStatus, Gender,
        Member, OrganizationSettings, OrganizationType,
    },
    error::AppResult,
    infrastructure::RequestContext,
};

struct SampleOrganization {
    name: &'static str,
    description: &'static str,
    org_type: OrganizationType,
    location: &'static str,
    rule: ParticipationRule,
    members: &'static [(&'static str, Gender, i32, &'static str)],
    event_title: &'static str,
    event_location: &'static str,
}

const SAMPLES: &[SampleOrganization] = &[
    SampleOrganization {
        name: "Weekend Hikers",
        description: "Saturday morning hikes around the city",
        org_type: OrganizationType::Sports,
        location: "Seoul",
        rule: ParticipationRule::PerMonth(2),
        members: &[
            ("Kim Minsu", Gender::Male, 1988, "Mapo"),
            ("Lee Jiyoung", Gender::Female, 1992, "Jongno"),
            ("Park Seojun", Gender::Male, 1995, "Gangnam"),
            ("Choi Yuna", Gender::Female, 1990, "Mapo"),
            ("Jung Hoon", Gender::Male, 1985, "Seocho"),
        ],
        event_title: "Saturday hike",
        event_location: "Bukhansan trailhead",
    },
    SampleOrganization {
        name: "Tuesday Book Circle",
        description: "One book a month, discussed over tea",
        org_type: OrganizationType::Study,
        location: "Busan",
        rule: ParticipationRule::Unlimited,
        members: &[
            ("Han Soyeon", Gender::Female, 1979, "Haeundae"),
            ("Oh Jisung", Gender::Male, 1983, "Suyeong"),
            ("Yoon Ara", Gender::Female, 1998, "Nam"),
        ],
        event_title: "Book discussion",
        event_location: "Central library room 3",
    },
];

const EVENTS_PER_ORGANIZATION: i64 = 8;

/// Skip seeding when the store already holds organizations
pub async fn seed_sample_data(state: &AppState) -> AppResult<()> {
    if !state.organizations.list_all().await?.is_empty() {
        info!("Store already has data, skipping sample seed");
        return Ok(());
    }

    let ctx = RequestContext::system();
    let now = Utc::now();
    let mut member_total = 0;
    let mut event_total = 0;

    for sample in SAMPLES {
        let organization = state
            .organizations
            .create(
                CreateOrganizationRequest {
                    name: sample.name.to_string(),
                    description: Some(sample.description.to_string()),
                    org_type: Some(sample.org_type),
                    location: Some(sample.location.to_string()),
                    max_members: Some(30),
                    settings: Some(OrganizationSettings {
                        participation_rule: sample.rule,
                    }),
                },
                &ctx,
            )
            .await?;

        let mut members: Vec<Member> = Vec::with_capacity(sample.members.len());
        for (name, gender, birth_year, district) in sample.members {
            let member = state
                .members
                .create(
                    CreateMemberRequest {
                        name: name.to_string(),
                        gender: *gender,
                        birth_year: *birth_year,
                        district: Some(district.to_string()),
                        organization_id: organization.id.clone(),
                        status: None,
                        joined_at: Some(now - Duration::days(120)),
                    },
                    &ctx,
                )
                .await?;
            members.push(member);
        }

        // Weekly events going back in time; member i skips every (i + 2)th event
        for week in 0..EVENTS_PER_ORGANIZATION {
            let attendees = members
                .iter()
                .enumerate()
                .filter(|(i, _)| (week as usize) % (i + 2) != 0)
                .map(|(_, m)| m.id.clone())
                .collect();

            state
                .events
                .create(
                    CreateEventRequest {
                        organization_id: Some(organization.id.clone()),
                        title: Some(format!(
                            "{} #{}",
                            sample.event_title,
                            EVENTS_PER_ORGANIZATION - week
                        )),
                        description: None,
                        date: Some(now - Duration::weeks(week + 1)),
                        location: Some(sample.event_location.to_string()),
                        host_id: Some(members[0].id.clone()),
                        max_participants: None,
                        status: Some(EventStatus::Completed),
                        attendees,
                    },
                    &ctx,
                )
                .await?;
            event_total += 1;
        }
        member_total += members.len();
    }

    let logs = state.activity_logs.list_all().await?.len();
    info!(
        organizations = SAMPLES.len(),
        members = member_total,
        events = event_total,
        activity_logs = logs,
        "Sample data seeded"
    );
    Ok(())
}
