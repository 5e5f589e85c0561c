use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use super::{
    dto::{EventView, UserRef},
    repo_types::Event,
};
use crate::users::repo_types::UserSummary;

/// Replaces creator and attendee ids with user summaries, fetched in one query.
pub async fn populate(db: &PgPool, events: Vec<Event>) -> anyhow::Result<Vec<EventView>> {
    let mut ids: Vec<Uuid> = events
        .iter()
        .flat_map(|e| std::iter::once(e.creator_id).chain(e.attendees.iter().copied()))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, UserSummary> = UserSummary::by_ids(db, &ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(events.into_iter().map(|e| attach(e, &users)).collect())
}

pub async fn populate_one(db: &PgPool, event: Event) -> anyhow::Result<EventView> {
    let mut views = populate(db, vec![event]).await?;
    views
        .pop()
        .ok_or_else(|| anyhow::anyhow!("populate returned no event"))
}

/// Summaries of the event's attendees in attendance order; deleted users are skipped.
pub async fn attendees_of(db: &PgPool, event: &Event) -> anyhow::Result<Vec<UserSummary>> {
    let users: HashMap<Uuid, UserSummary> = UserSummary::by_ids(db, &event.attendees)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    Ok(event
        .attendees
        .iter()
        .filter_map(|id| users.get(id).cloned())
        .collect())
}

fn attach(event: Event, users: &HashMap<Uuid, UserSummary>) -> EventView {
    let creator = match users.get(&event.creator_id) {
        Some(u) => UserRef::User(u.clone()),
        None => UserRef::Id(event.creator_id),
    };
    let attendees = event
        .attendees
        .iter()
        .filter_map(|id| users.get(id).cloned())
        .collect();
    EventView {
        id: event.id,
        title: event.title,
        description: event.description,
        location: event.location,
        date: event.event_date,
        image: event.image,
        category: event.category,
        creator,
        attendees,
        created_at: event.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::repo_types::EventCategory;
    use time::OffsetDateTime;

    fn summary(name: &str) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            name: name.into(),
            avatar: format!("/{name}.png"),
        }
    }

    #[test]
    fn attach_resolves_known_users_and_keeps_order() {
        let ana = summary("ana");
        let luis = summary("luis");
        let gone = Uuid::new_v4();
        let users: HashMap<Uuid, UserSummary> =
            [(ana.id, ana.clone()), (luis.id, luis.clone())].into_iter().collect();

        let event = Event {
            id: Uuid::new_v4(),
            title: "Hackathon".into(),
            description: "24h".into(),
            location: "Valencia".into(),
            event_date: OffsetDateTime::UNIX_EPOCH,
            image: "/e.jpg".into(),
            category: EventCategory::Technology,
            creator_id: ana.id,
            attendees: vec![luis.id, gone, ana.id],
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let view = attach(event, &users);
        assert_eq!(view.creator, UserRef::User(ana.clone()));
        assert_eq!(view.attendees, vec![luis, ana]);
    }

    #[test]
    fn missing_creator_stays_an_id() {
        let creator = Uuid::new_v4();
        let event = Event {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            location: "l".into(),
            event_date: OffsetDateTime::UNIX_EPOCH,
            image: "/e.jpg".into(),
            category: EventCategory::Other,
            creator_id: creator,
            attendees: Vec::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(attach(event, &HashMap::new()).creator, UserRef::Id(creator));
    }
}
