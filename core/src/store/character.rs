use super::{CharacterRelRow, CharacterRow, RegStore};
use crate::{
    error::RegResult,
    types::{CharacterId, CharacterStatus, EventId, MemberId, RegistrationId, RunId},
};
use rusqlite::{params, OptionalExtension};
use std::collections::{HashMap, HashSet};

impl RegStore {
    // ── Character ─────────────────────────────────────────────────

    pub fn insert_character(&self, c: &CharacterRow) -> RegResult<CharacterId> {
        self.conn.execute(
            "INSERT INTO character (id, event_id, number, name, player_id, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![c.id, c.event_id, c.number, c.name, c.player_id, c.status.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_character(&self, character_id: CharacterId) -> RegResult<Option<CharacterRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, event_id, number, name, player_id, status
                 FROM character WHERE id = ?1",
                params![character_id],
                Self::map_character_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Characters of an event owned by the member and not assigned to any
    /// active registration.
    pub fn unassigned_characters_of_player(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> RegResult<Vec<CharacterRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.event_id, c.number, c.name, c.player_id, c.status
             FROM character c
             WHERE c.event_id = ?1 AND c.player_id = ?2
               AND NOT EXISTS (
                   SELECT 1 FROM registration_character_rel rel
                   JOIN registration r ON r.id = rel.reg_id
                   WHERE rel.character_id = c.id AND r.cancellation_date IS NULL
               )
             ORDER BY c.number ASC",
        )?;
        let rows = stmt
            .query_map(params![event_id, member_id], Self::map_character_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Characters assigned to a registration, in character-number order.
    pub fn characters_for_registration(
        &self,
        reg_id: RegistrationId,
    ) -> RegResult<Vec<CharacterRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.event_id, c.number, c.name, c.player_id, c.status
             FROM registration_character_rel rel
             JOIN character c ON c.id = rel.character_id
             WHERE rel.reg_id = ?1
             ORDER BY c.number ASC",
        )?;
        let rows = stmt
            .query_map(params![reg_id], Self::map_character_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_character_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CharacterRow> {
        Ok(CharacterRow {
            id: row.get(0)?,
            event_id: row.get(1)?,
            number: row.get(2)?,
            name: row.get(3)?,
            player_id: row.get(4)?,
            status: CharacterStatus::parse(&row.get::<_, String>(5)?),
        })
    }

    // ── Character relations ───────────────────────────────────────

    pub fn insert_character_rel(
        &self,
        reg_id: RegistrationId,
        character_id: CharacterId,
        custom_name: Option<&str>,
    ) -> RegResult<i64> {
        self.conn.execute(
            "INSERT INTO registration_character_rel (reg_id, character_id, custom_name)
             VALUES (?1, ?2, ?3)",
            params![reg_id, character_id, custom_name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn character_rels_for_registration(
        &self,
        reg_id: RegistrationId,
    ) -> RegResult<Vec<CharacterRelRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reg_id, character_id, custom_name FROM registration_character_rel
             WHERE reg_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![reg_id], |row| {
                Ok(CharacterRelRow {
                    id: row.get(0)?,
                    reg_id: row.get(1)?,
                    character_id: row.get(2)?,
                    custom_name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_character_rels_for_registration(
        &self,
        reg_id: RegistrationId,
    ) -> RegResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM registration_character_rel WHERE reg_id = ?1",
            params![reg_id],
        )?;
        Ok(n)
    }

    /// Assigned-character count per active registration of a run.
    /// Registrations without characters are absent from the map.
    pub fn character_counts_for_run(
        &self,
        run_id: RunId,
    ) -> RegResult<HashMap<RegistrationId, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT rel.reg_id, COUNT(*)
             FROM registration_character_rel rel
             JOIN registration r ON r.id = rel.reg_id
             WHERE r.run_id = ?1 AND r.cancellation_date IS NULL
             GROUP BY rel.reg_id",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    // ── Casting preferences ───────────────────────────────────────

    pub fn insert_casting_preference(
        &self,
        member_id: MemberId,
        run_id: RunId,
        element_id: i64,
        pref: i64,
    ) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO casting_preference (member_id, run_id, element_id, pref)
             VALUES (?1, ?2, ?3, ?4)",
            params![member_id, run_id, element_id, pref],
        )?;
        Ok(())
    }

    /// Members who submitted at least one casting preference for the run.
    pub fn casting_members_for_run(&self, run_id: RunId) -> RegResult<HashSet<MemberId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT member_id FROM casting_preference WHERE run_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(rows)
    }
}
