use super::{AnswerRow, ChoiceRow, OptionRow, QuestionRow, RegStore};
use crate::{
    error::RegResult,
    types::{EventId, OptionId, QuestionId, RegistrationId},
};
use rusqlite::{params, OptionalExtension};

impl RegStore {
    // ── Registration form ─────────────────────────────────────────

    pub fn insert_question(&self, q: &QuestionRow) -> RegResult<QuestionId> {
        self.conn.execute(
            "INSERT INTO registration_question (id, event_id, typ, name) VALUES (?1, ?2, ?3, ?4)",
            params![q.id, q.event_id, q.typ, q.name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_question(&self, question_id: QuestionId) -> RegResult<Option<QuestionRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, event_id, typ, name FROM registration_question
                 WHERE id = ?1 AND deleted = 0",
                params![question_id],
                Self::map_question_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn questions_for_event(&self, event_id: EventId) -> RegResult<Vec<QuestionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, typ, name FROM registration_question
             WHERE event_id = ?1 AND deleted = 0 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![event_id], Self::map_question_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_question_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuestionRow> {
        Ok(QuestionRow {
            id: row.get(0)?,
            event_id: row.get(1)?,
            typ: row.get(2)?,
            name: row.get(3)?,
        })
    }

    pub fn insert_option(&self, o: &OptionRow) -> RegResult<OptionId> {
        self.conn.execute(
            "INSERT INTO registration_option (id, question_id, name, price) VALUES (?1, ?2, ?3, ?4)",
            params![o.id, o.question_id, o.name, o.price],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_option(&self, option_id: OptionId) -> RegResult<Option<OptionRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, question_id, name, price FROM registration_option
                 WHERE id = ?1 AND deleted = 0",
                params![option_id],
                Self::map_option_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn options_for_question(&self, question_id: QuestionId) -> RegResult<Vec<OptionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question_id, name, price FROM registration_option
             WHERE question_id = ?1 AND deleted = 0 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![question_id], Self::map_option_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_option_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OptionRow> {
        Ok(OptionRow {
            id: row.get(0)?,
            question_id: row.get(1)?,
            name: row.get(2)?,
            price: row.get(3)?,
        })
    }

    // ── Choices and answers ───────────────────────────────────────

    pub fn insert_choice(
        &self,
        reg_id: RegistrationId,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> RegResult<i64> {
        self.conn.execute(
            "INSERT INTO registration_choice (reg_id, question_id, option_id) VALUES (?1, ?2, ?3)",
            params![reg_id, question_id, option_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn choices_for_registration(&self, reg_id: RegistrationId) -> RegResult<Vec<ChoiceRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reg_id, question_id, option_id FROM registration_choice
             WHERE reg_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![reg_id], |row| {
                Ok(ChoiceRow {
                    id: row.get(0)?,
                    reg_id: row.get(1)?,
                    question_id: row.get(2)?,
                    option_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_choices_for_registration(&self, reg_id: RegistrationId) -> RegResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM registration_choice WHERE reg_id = ?1",
            params![reg_id],
        )?;
        Ok(n)
    }

    pub fn insert_answer(
        &self,
        reg_id: RegistrationId,
        question_id: QuestionId,
        text: &str,
    ) -> RegResult<i64> {
        self.conn.execute(
            "INSERT INTO registration_answer (reg_id, question_id, text) VALUES (?1, ?2, ?3)",
            params![reg_id, question_id, text],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn answers_for_registration(&self, reg_id: RegistrationId) -> RegResult<Vec<AnswerRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reg_id, question_id, text FROM registration_answer
             WHERE reg_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![reg_id], |row| {
                Ok(AnswerRow {
                    id: row.get(0)?,
                    reg_id: row.get(1)?,
                    question_id: row.get(2)?,
                    text: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_answers_for_registration(&self, reg_id: RegistrationId) -> RegResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM registration_answer WHERE reg_id = ?1",
            params![reg_id],
        )?;
        Ok(n)
    }
}
