use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    has_capacity, BrotherhoodEvent, BrotherhoodGroup, CreateEventRequest, CreateGroupRequest,
    EventRsvp, GroupMember, MemberRole, RsvpStatus,
};
use crate::services::nutrition_plan_service::unique_name_conflict;

const GROUP_SELECT: &str = r#"
    SELECT g.id, g.name, g.description, g.is_private, g.max_members, g.created_by,
           (SELECT COUNT(*) FROM brotherhood_members m WHERE m.group_id = g.id) AS member_count,
           g.created_at
    FROM brotherhood_groups g
    WHERE g.deleted_at IS NULL
"#;

const EVENT_SELECT: &str = r#"
    SELECT e.id, e.group_id, e.title, e.description, e.location, e.starts_at, e.ends_at,
           e.max_attendees, e.created_by,
           (SELECT COUNT(*) FROM brotherhood_event_rsvps r
            WHERE r.event_id = e.id AND r.status = 'going') AS going_count,
           e.created_at
    FROM brotherhood_events e
    JOIN brotherhood_groups g ON g.id = e.group_id
    WHERE g.deleted_at IS NULL
"#;

#[derive(Debug, Clone)]
pub struct BrotherhoodService {
    db: PgPool,
}

impl BrotherhoodService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_groups(&self) -> AppResult<Vec<BrotherhoodGroup>> {
        let sql = format!("{} ORDER BY g.name", GROUP_SELECT);
        let groups = sqlx::query_as::<_, BrotherhoodGroup>(&sql)
            .fetch_all(&self.db)
            .await?;
        Ok(groups)
    }

    pub async fn get_group(&self, group_id: Uuid) -> AppResult<BrotherhoodGroup> {
        let sql = format!("{} AND g.id = $1", GROUP_SELECT);
        sqlx::query_as::<_, BrotherhoodGroup>(&sql)
            .bind(group_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Brotherhood group"))
    }

    pub async fn find_group_by_name(&self, name: &str) -> AppResult<Option<BrotherhoodGroup>> {
        let sql = format!("{} AND g.name = $1", GROUP_SELECT);
        let group = sqlx::query_as::<_, BrotherhoodGroup>(&sql)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        Ok(group)
    }

    /// The creator is inserted as the owning member in the same transaction
    pub async fn create_group(&self, creator_id: Uuid, request: CreateGroupRequest) -> AppResult<BrotherhoodGroup> {
        let group_id = Uuid::new_v4();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO brotherhood_groups (id, name, description, is_private, max_members, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(group_id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.is_private)
        .bind(request.max_members)
        .bind(creator_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_name_conflict(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("A group named '{}' already exists", request.name.trim()))
            }
            other => other,
        })?;

        sqlx::query("INSERT INTO brotherhood_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group_id)
            .bind(creator_id)
            .bind(MemberRole::Owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%group_id, %creator_id, "Created brotherhood group");
        self.get_group(group_id).await
    }

    pub async fn delete_group(&self, group_id: Uuid, user_id: Uuid, is_admin: bool) -> AppResult<()> {
        let group = self.get_group(group_id).await?;

        if !is_admin && self.member_role(group_id, user_id).await? != Some(MemberRole::Owner) {
            return Err(AppError::Forbidden);
        }

        sqlx::query("UPDATE brotherhood_groups SET deleted_at = NOW() WHERE id = $1")
            .bind(group.id)
            .execute(&self.db)
            .await?;

        tracing::info!(%group_id, deleted_by = %user_id, "Deleted brotherhood group");
        Ok(())
    }

    /// The group row is locked while the capacity is checked
    pub async fn join(&self, group_id: Uuid, user_id: Uuid) -> AppResult<GroupMember> {
        let mut tx = self.db.begin().await?;

        let max_members: Option<i32> = sqlx::query_scalar(
            "SELECT max_members FROM brotherhood_groups WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(group_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Brotherhood group"))?;

        let (already_member, member_count): (bool, i64) = sqlx::query_as(
            "SELECT COALESCE(BOOL_OR(user_id = $2), false), COUNT(*)
             FROM brotherhood_members WHERE group_id = $1",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_member {
            return Err(AppError::Conflict("Already a member of this group".to_string()));
        }

        if !has_capacity(member_count, max_members) {
            return Err(AppError::Conflict("This group is full".to_string()));
        }

        sqlx::query("INSERT INTO brotherhood_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group_id)
            .bind(user_id)
            .bind(MemberRole::Member)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.get_member(group_id, user_id).await
    }

    pub async fn leave(&self, group_id: Uuid, user_id: Uuid) -> AppResult<()> {
        match self.member_role(group_id, user_id).await? {
            None => Err(AppError::NotFound("Group membership")),
            Some(MemberRole::Owner) => Err(AppError::Validation(
                "The owner cannot leave the group, delete it instead".to_string(),
            )),
            Some(_) => {
                sqlx::query("DELETE FROM brotherhood_members WHERE group_id = $1 AND user_id = $2")
                    .bind(group_id)
                    .bind(user_id)
                    .execute(&self.db)
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn members(&self, group_id: Uuid) -> AppResult<Vec<GroupMember>> {
        self.get_group(group_id).await?;

        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.group_id, m.user_id, p.display_name, m.role, m.joined_at
            FROM brotherhood_members m
            LEFT JOIN profiles p ON p.user_id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    /// Email address and display name of every member except `exclude`
    pub async fn member_contacts(&self, group_id: Uuid, exclude: Uuid) -> AppResult<Vec<(String, Option<String>)>> {
        let contacts = sqlx::query_as::<_, (String, Option<String>)>(
            r#"
            SELECT u.email, p.display_name
            FROM brotherhood_members m
            JOIN users u ON u.id = m.user_id
            LEFT JOIN profiles p ON p.user_id = m.user_id
            WHERE m.group_id = $1 AND m.user_id <> $2
            "#,
        )
        .bind(group_id)
        .bind(exclude)
        .fetch_all(&self.db)
        .await?;

        Ok(contacts)
    }

    pub async fn create_event(&self, group_id: Uuid, user_id: Uuid, request: CreateEventRequest) -> AppResult<BrotherhoodEvent> {
        request.check_schedule().map_err(AppError::Validation)?;
        self.get_group(group_id).await?;

        if self.member_role(group_id, user_id).await?.is_none() {
            return Err(AppError::Forbidden);
        }

        let event_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO brotherhood_events
                 (id, group_id, title, description, location, starts_at, ends_at, max_attendees, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(event_id)
        .bind(group_id)
        .bind(request.title.trim())
        .bind(request.description)
        .bind(request.location)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.max_attendees)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        self.get_event(event_id).await
    }

    pub async fn get_event(&self, event_id: Uuid) -> AppResult<BrotherhoodEvent> {
        let sql = format!("{} AND e.id = $1", EVENT_SELECT);
        sqlx::query_as::<_, BrotherhoodEvent>(&sql)
            .bind(event_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Brotherhood event"))
    }

    pub async fn list_events(&self, group_id: Uuid, upcoming_only: bool) -> AppResult<Vec<BrotherhoodEvent>> {
        self.get_group(group_id).await?;

        let sql = format!(
            "{} AND e.group_id = $1 AND (NOT $2 OR e.ends_at >= NOW()) ORDER BY e.starts_at",
            EVENT_SELECT
        );
        let events = sqlx::query_as::<_, BrotherhoodEvent>(&sql)
            .bind(group_id)
            .bind(upcoming_only)
            .fetch_all(&self.db)
            .await?;

        Ok(events)
    }

    /// The event row is locked while the `going` count is checked
    pub async fn rsvp(&self, event_id: Uuid, user_id: Uuid, status: RsvpStatus) -> AppResult<EventRsvp> {
        let mut tx = self.db.begin().await?;

        let max_attendees: Option<i32> = sqlx::query_scalar(
            "SELECT e.max_attendees
             FROM brotherhood_events e
             JOIN brotherhood_groups g ON g.id = e.group_id
             WHERE e.id = $1 AND g.deleted_at IS NULL
             FOR UPDATE OF e",
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Brotherhood event"))?;

        if status == RsvpStatus::Going {
            let (already_going, going_count): (bool, i64) = sqlx::query_as(
                "SELECT COALESCE(BOOL_OR(user_id = $2), false), COUNT(*)
                 FROM brotherhood_event_rsvps WHERE event_id = $1 AND status = 'going'",
            )
            .bind(event_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

            if !already_going && !has_capacity(going_count, max_attendees) {
                return Err(AppError::Conflict("This event is fully booked".to_string()));
            }
        }

        let rsvp = sqlx::query_as::<_, EventRsvp>(
            r#"
            INSERT INTO brotherhood_event_rsvps (event_id, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id, user_id)
            DO UPDATE SET status = EXCLUDED.status, responded_at = NOW()
            RETURNING event_id, user_id, status, responded_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rsvp)
    }

    async fn member_role(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Option<MemberRole>> {
        let role = sqlx::query_scalar::<_, MemberRole>(
            "SELECT role FROM brotherhood_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    async fn get_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<GroupMember> {
        sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.group_id, m.user_id, p.display_name, m.role, m.joined_at
            FROM brotherhood_members m
            LEFT JOIN profiles p ON p.user_id = m.user_id
            WHERE m.group_id = $1 AND m.user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("Group membership"))
    }
}
