use async_trait::async_trait;
use burrow_common::{absolutize, relativize, Attrs, EngineError, EngineResult, EntityDetail, Filter, MessageDetail};
use burrow_engine::{EntityProjection, MessageProjection, ScanMode, StorageEngine};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

use crate::{SqliteEngine, MAXIMUM_PARAMETERS};

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

fn get_account_rowid(conn: &Connection, account: &str) -> EngineResult<i64> {
    conn.query_row("SELECT rowid FROM accounts WHERE account = ?1", params![account], |row| row.get(0))
        .optional()
        .expect("query account rowid")
        .ok_or_else(|| EngineError::not_found(format!("account '{}' not found", account)))
}

fn get_queue_rowid(conn: &Connection, account_rowid: i64, queue: &str) -> EngineResult<i64> {
    conn.query_row(
        "SELECT rowid FROM queues WHERE account_rowid = ?1 AND queue = ?2",
        params![account_rowid, queue],
        |row| row.get(0),
    )
    .optional()
    .expect("query queue rowid")
    .ok_or_else(|| EngineError::not_found(format!("queue '{}' not found", queue)))
}

fn get_message_rowid(conn: &Connection, queue_rowid: i64, id: &str) -> EngineResult<i64> {
    conn.query_row(
        "SELECT rowid FROM messages WHERE queue_rowid = ?1 AND message = ?2",
        params![queue_rowid, id],
        |row| row.get(0),
    )
    .optional()
    .expect("query message rowid")
    .ok_or_else(|| EngineError::not_found(format!("message '{}' not found", id)))
}

fn get_message_full(conn: &Connection, queue_rowid: i64, id: &str) -> EngineResult<(i64, i64, i64, Vec<u8>)> {
    conn.query_row(
        "SELECT rowid, ttl, hide, body FROM messages WHERE queue_rowid = ?1 AND message = ?2",
        params![queue_rowid, id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )
    .optional()
    .expect("query message")
    .ok_or_else(|| EngineError::not_found(format!("message '{}' not found", id)))
}

fn project_message(id: &str, ttl: i64, hide: i64, body: &[u8], detail: MessageDetail, now: i64) -> MessageProjection {
    match detail {
        MessageDetail::None | MessageDetail::Id => MessageProjection::Id(id.to_string()),
        MessageDetail::Body => MessageProjection::Body(body.to_vec()),
        MessageDetail::Attributes => MessageProjection::Attributes {
            id:   id.to_string(),
            ttl:  relativize(ttl, now),
            hide: relativize(hide, now),
        },
        MessageDetail::All => MessageProjection::All {
            id:   id.to_string(),
            ttl:  relativize(ttl, now),
            hide: relativize(hide, now),
            body: body.to_vec(),
        },
    }
}

fn project_entity(id: &str, detail: EntityDetail) -> Option<EntityProjection> {
    match detail {
        EntityDetail::None => None,
        EntityDetail::Id => Some(EntityProjection::Id(id.to_string())),
        EntityDetail::All => Some(EntityProjection::All(id.to_string())),
    }
}

fn delete_message_rowids(conn: &Connection, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }
    let query = format!("DELETE FROM messages WHERE rowid IN ({})", placeholders(ids.len()));
    conn.execute(&query, rusqlite::params_from_iter(ids.iter()))
        .expect("delete messages");
}

fn check_empty_queue(conn: &Connection, account_rowid: i64, queue_rowid: i64) {
    let has_messages: bool = conn
        .query_row("SELECT EXISTS(SELECT 1 FROM messages WHERE queue_rowid = ?1)", params![queue_rowid], |row| {
            row.get(0)
        })
        .expect("check queue empty");
    if !has_messages {
        conn.execute("DELETE FROM queues WHERE rowid = ?1", params![queue_rowid])
            .expect("delete empty queue");
        check_empty_account(conn, account_rowid);
    }
}

fn check_empty_account(conn: &Connection, account_rowid: i64) {
    let has_queues: bool = conn
        .query_row("SELECT EXISTS(SELECT 1 FROM queues WHERE account_rowid = ?1)", params![account_rowid], |row| {
            row.get(0)
        })
        .expect("check account empty");
    if !has_queues {
        conn.execute("DELETE FROM accounts WHERE rowid = ?1", params![account_rowid])
            .expect("delete empty account");
    }
}

#[async_trait]
impl StorageEngine for SqliteEngine {
    async fn create_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        body: Vec<u8>,
        attrs: Attrs,
        now: i64,
    ) -> EngineResult<bool> {
        let ttl = absolutize(attrs.ttl.unwrap_or(0), now);
        let hide = absolutize(attrs.hide.unwrap_or(0), now);

        let created = {
            let conn = self.conn.lock().unwrap();
            let account_rowid = match get_account_rowid(&conn, account) {
                Ok(rowid) => rowid,
                Err(_) => {
                    conn.execute("INSERT INTO accounts VALUES (?1)", params![account])
                        .expect("insert account");
                    conn.last_insert_rowid()
                },
            };
            let queue_rowid = match get_queue_rowid(&conn, account_rowid, queue) {
                Ok(rowid) => rowid,
                Err(_) => {
                    conn.execute("INSERT INTO queues VALUES (?1, ?2)", params![account_rowid, queue])
                        .expect("insert queue");
                    conn.last_insert_rowid()
                },
            };
            match get_message_rowid(&conn, queue_rowid, id) {
                Ok(rowid) => {
                    conn.execute(
                        "UPDATE messages SET ttl = ?1, hide = ?2, body = ?3 WHERE rowid = ?4",
                        params![ttl, hide, body, rowid],
                    )
                    .expect("update message");
                    false
                },
                Err(_) => {
                    conn.execute(
                        "INSERT INTO messages VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![queue_rowid, id, ttl, hide, body],
                    )
                    .expect("insert message");
                    true
                },
            }
        };

        if created || hide == 0 {
            self.waiters.notify(account, queue);
        }
        Ok(created)
    }

    async fn get_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail, now: i64) -> EngineResult<MessageProjection> {
        let conn = self.conn.lock().unwrap();
        let account_rowid = get_account_rowid(&conn, account)?;
        let queue_rowid = get_queue_rowid(&conn, account_rowid, queue)?;
        let (_, ttl, hide, body) = get_message_full(&conn, queue_rowid, id)?;
        Ok(project_message(id, ttl, hide, &body, detail, now))
    }

    async fn delete_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail, now: i64) -> EngineResult<MessageProjection> {
        let conn = self.conn.lock().unwrap();
        let account_rowid = get_account_rowid(&conn, account)?;
        let queue_rowid = get_queue_rowid(&conn, account_rowid, queue)?;
        let (rowid, ttl, hide, body) = get_message_full(&conn, queue_rowid, id)?;
        let projected = project_message(id, ttl, hide, &body, detail, now);
        conn.execute("DELETE FROM messages WHERE rowid = ?1", params![rowid])
            .expect("delete message");
        check_empty_queue(&conn, account_rowid, queue_rowid);
        Ok(projected)
    }

    async fn update_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        attrs: Attrs,
        detail: MessageDetail,
        now: i64,
    ) -> EngineResult<MessageProjection> {
        let (projected, notify) = {
            let conn = self.conn.lock().unwrap();
            let account_rowid = get_account_rowid(&conn, account)?;
            let queue_rowid = get_queue_rowid(&conn, account_rowid, queue)?;
            let (rowid, mut ttl, mut hide, body) = get_message_full(&conn, queue_rowid, id)?;

            let mut notify = false;
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<i64> = Vec::new();
            if let Some(rel_ttl) = attrs.ttl {
                ttl = absolutize(rel_ttl, now);
                sets.push("ttl = ?");
                values.push(ttl);
            }
            if let Some(rel_hide) = attrs.hide {
                hide = absolutize(rel_hide, now);
                sets.push("hide = ?");
                values.push(hide);
                if hide == 0 {
                    notify = true;
                }
            }
            if !sets.is_empty() {
                let query = format!("UPDATE messages SET {} WHERE rowid = ?", sets.join(", "));
                values.push(rowid);
                conn.execute(&query, rusqlite::params_from_iter(values.iter())).expect("update message");
            }

            (project_message(id, ttl, hide, &body, detail, now), notify)
        };
        if notify {
            self.waiters.notify(account, queue);
        }
        Ok(projected)
    }

    async fn scan_messages(
        &self,
        account: &str,
        queue: &str,
        filter: &Filter,
        mode: ScanMode,
        update: Option<Attrs>,
        detail: MessageDetail,
        now: i64,
        visit: &mut (dyn FnMut(MessageProjection) + Send),
    ) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        let account_rowid = get_account_rowid(&conn, account)?;
        let queue_rowid = get_queue_rowid(&conn, account_rowid, queue)?;

        let mut query = "SELECT rowid, message, ttl, hide, body FROM messages WHERE queue_rowid = ?".to_string();
        let mut values: Vec<i64> = vec![queue_rowid];
        if let Some(marker) = &filter.marker {
            if let Ok(marker_rowid) = get_message_rowid(&conn, queue_rowid, marker) {
                query.push_str(" AND rowid > ?");
                values.push(marker_rowid);
            }
        }
        if !filter.match_hidden {
            query.push_str(" AND hide = 0");
        }
        if let Some(limit) = filter.limit {
            query.push_str(" LIMIT ?");
            values.push(limit as i64);
        }

        let mut rowids: Vec<i64> = Vec::new();
        let mut notify = false;
        {
            let mut stmt = conn.prepare(&query).expect("prepare message scan");
            let mut rows = stmt.query(rusqlite::params_from_iter(values.iter())).expect("query message scan");
            while let Some(row) = rows.next().expect("step message scan") {
                let rowid: i64 = row.get(0).expect("rowid column");
                let id: String = row.get(1).expect("message column");
                let mut ttl: i64 = row.get(2).expect("ttl column");
                let mut hide: i64 = row.get(3).expect("hide column");
                let body: Vec<u8> = row.get(4).expect("body column");

                if let Some(attrs) = update {
                    if let Some(rel_ttl) = attrs.ttl {
                        ttl = absolutize(rel_ttl, now);
                    }
                    if let Some(rel_hide) = attrs.hide {
                        hide = absolutize(rel_hide, now);
                        if hide == 0 {
                            notify = true;
                        }
                    }
                }

                if !matches!(detail, MessageDetail::None) {
                    visit(project_message(&id, ttl, hide, &body, detail, now));
                }

                rowids.push(rowid);
            }
        }

        if rowids.is_empty() {
            return Err(EngineError::not_found(format!("no messages found in queue '{}'", queue)));
        }

        match mode {
            ScanMode::Delete => {
                for chunk in rowids.chunks(MAXIMUM_PARAMETERS) {
                    delete_message_rowids(&conn, chunk);
                }
            },
            ScanMode::Get => {
                if let Some(attrs) = update {
                    let mut sets: Vec<&str> = Vec::new();
                    let mut set_values: Vec<i64> = Vec::new();
                    if let Some(rel_ttl) = attrs.ttl {
                        sets.push("ttl = ?");
                        set_values.push(absolutize(rel_ttl, now));
                    }
                    if let Some(rel_hide) = attrs.hide {
                        sets.push("hide = ?");
                        set_values.push(absolutize(rel_hide, now));
                    }
                    if !sets.is_empty() {
                        for chunk in rowids.chunks(MAXIMUM_PARAMETERS) {
                            let query = format!(
                                "UPDATE messages SET {} WHERE rowid IN ({})",
                                sets.join(", "),
                                placeholders(chunk.len())
                            );
                            let all_values: Vec<i64> = set_values.iter().chain(chunk.iter()).cloned().collect();
                            conn.execute(&query, rusqlite::params_from_iter(all_values.iter()))
                                .expect("update messages");
                        }
                    }
                }
            },
        }

        check_empty_queue(&conn, account_rowid, queue_rowid);
        drop(conn);

        if notify {
            self.waiters.notify(account, queue);
        }
        Ok(())
    }

    async fn get_accounts(&self, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let conn = self.conn.lock().unwrap();
        let mut query = "SELECT account FROM accounts".to_string();
        let mut values: Vec<i64> = Vec::new();
        if let Some(marker) = &filter.marker {
            if let Ok(marker_rowid) = get_account_rowid(&conn, marker) {
                query.push_str(" WHERE rowid > ?");
                values.push(marker_rowid);
            }
        }
        if let Some(limit) = filter.limit {
            query.push_str(" LIMIT ?");
            values.push(limit as i64);
        }

        let mut stmt = conn.prepare(&query).expect("prepare get_accounts");
        let mut rows = stmt.query(rusqlite::params_from_iter(values.iter())).expect("query get_accounts");
        let mut result = Vec::new();
        let mut count: u64 = 0;
        while let Some(row) = rows.next().expect("step get_accounts") {
            let account: String = row.get(0).expect("account column");
            count += 1;
            if let Some(projection) = project_entity(&account, detail) {
                result.push(projection);
            }
        }
        if count == 0 {
            return Err(EngineError::not_found("no accounts found"));
        }
        Ok(result)
    }

    async fn delete_accounts(&self, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let conn = self.conn.lock().unwrap();
        let mut query = "SELECT rowid, account FROM accounts".to_string();
        let mut values: Vec<i64> = Vec::new();
        if let Some(marker) = &filter.marker {
            if let Ok(marker_rowid) = get_account_rowid(&conn, marker) {
                query.push_str(" WHERE rowid > ?");
                values.push(marker_rowid);
            }
        }
        if let Some(limit) = filter.limit {
            query.push_str(" LIMIT ?");
            values.push(limit as i64);
        }

        let mut result = Vec::new();
        let mut ids: Vec<i64> = Vec::new();
        {
            let mut stmt = conn.prepare(&query).expect("prepare delete_accounts");
            let mut rows = stmt.query(rusqlite::params_from_iter(values.iter())).expect("query delete_accounts");
            while let Some(row) = rows.next().expect("step delete_accounts") {
                let rowid: i64 = row.get(0).expect("rowid column");
                let account: String = row.get(1).expect("account column");
                if let Some(projection) = project_entity(&account, detail) {
                    result.push(projection);
                }
                ids.push(rowid);
            }
        }
        if ids.is_empty() {
            return Err(EngineError::not_found("no accounts to delete"));
        }

        for chunk in ids.chunks(MAXIMUM_PARAMETERS) {
            let ph = placeholders(chunk.len());
            let queue_query = format!("SELECT rowid FROM queues WHERE account_rowid IN ({})", ph);
            let queue_ids: Vec<i64> = {
                let mut stmt = conn.prepare(&queue_query).expect("prepare queue lookup");
                stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| row.get(0))
                    .expect("query queues")
                    .filter_map(Result::ok)
                    .collect()
            };
            for message_chunk in queue_ids.chunks(MAXIMUM_PARAMETERS) {
                let message_ph = placeholders(message_chunk.len());
                conn.execute(
                    &format!("DELETE FROM messages WHERE queue_rowid IN ({})", message_ph),
                    rusqlite::params_from_iter(message_chunk.iter()),
                )
                .expect("delete messages");
            }
            conn.execute(
                &format!("DELETE FROM queues WHERE account_rowid IN ({})", ph),
                rusqlite::params_from_iter(chunk.iter()),
            )
            .expect("delete queues");
            conn.execute(&format!("DELETE FROM accounts WHERE rowid IN ({})", ph), rusqlite::params_from_iter(chunk.iter()))
                .expect("delete accounts");
        }
        Ok(result)
    }

    async fn get_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let conn = self.conn.lock().unwrap();
        let account_rowid = get_account_rowid(&conn, account)?;
        let mut query = "SELECT queue FROM queues WHERE account_rowid = ?".to_string();
        let mut values: Vec<i64> = vec![account_rowid];
        if let Some(marker) = &filter.marker {
            if let Ok(marker_rowid) = get_queue_rowid(&conn, account_rowid, marker) {
                query.push_str(" AND rowid > ?");
                values.push(marker_rowid);
            }
        }
        if let Some(limit) = filter.limit {
            query.push_str(" LIMIT ?");
            values.push(limit as i64);
        }

        let mut stmt = conn.prepare(&query).expect("prepare get_queues");
        let mut rows = stmt.query(rusqlite::params_from_iter(values.iter())).expect("query get_queues");
        let mut result = Vec::new();
        let mut count: u64 = 0;
        while let Some(row) = rows.next().expect("step get_queues") {
            let queue: String = row.get(0).expect("queue column");
            count += 1;
            if let Some(projection) = project_entity(&queue, detail) {
                result.push(projection);
            }
        }
        if count == 0 {
            return Err(EngineError::not_found(format!("no queues found for account '{}'", account)));
        }
        Ok(result)
    }

    async fn delete_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> EngineResult<Vec<EntityProjection>> {
        let conn = self.conn.lock().unwrap();
        let account_rowid = get_account_rowid(&conn, account)?;
        let mut query = "SELECT rowid, queue FROM queues WHERE account_rowid = ?".to_string();
        let mut values: Vec<i64> = vec![account_rowid];
        if let Some(marker) = &filter.marker {
            if let Ok(marker_rowid) = get_queue_rowid(&conn, account_rowid, marker) {
                query.push_str(" AND rowid > ?");
                values.push(marker_rowid);
            }
        }
        if let Some(limit) = filter.limit {
            query.push_str(" LIMIT ?");
            values.push(limit as i64);
        }

        let mut result = Vec::new();
        let mut ids: Vec<i64> = Vec::new();
        {
            let mut stmt = conn.prepare(&query).expect("prepare delete_queues");
            let mut rows = stmt.query(rusqlite::params_from_iter(values.iter())).expect("query delete_queues");
            while let Some(row) = rows.next().expect("step delete_queues") {
                let rowid: i64 = row.get(0).expect("rowid column");
                let queue: String = row.get(1).expect("queue column");
                if let Some(projection) = project_entity(&queue, detail) {
                    result.push(projection);
                }
                ids.push(rowid);
            }
        }
        if ids.is_empty() {
            return Err(EngineError::not_found(format!("no queues to delete for account '{}'", account)));
        }

        for chunk in ids.chunks(MAXIMUM_PARAMETERS) {
            let ph = placeholders(chunk.len());
            conn.execute(
                &format!("DELETE FROM messages WHERE queue_rowid IN ({})", ph),
                rusqlite::params_from_iter(chunk.iter()),
            )
            .expect("delete messages");
        }
        let ph = placeholders(ids.len());
        conn.execute(&format!("DELETE FROM queues WHERE rowid IN ({})", ph), rusqlite::params_from_iter(ids.iter()))
            .expect("delete queues");
        check_empty_account(&conn, account_rowid);
        Ok(result)
    }

    async fn clean(&self, now: i64) {
        let to_notify: Vec<(String, String)> = {
            let conn = self.conn.lock().unwrap();

            let ttl_rows: Vec<(i64, i64)> = {
                let mut stmt = conn
                    .prepare("SELECT rowid, queue_rowid FROM messages WHERE ttl > 0 AND ttl <= ?1")
                    .expect("prepare ttl scan");
                stmt.query_map(params![now], |row| Ok((row.get(0)?, row.get(1)?)))
                    .expect("query ttl scan")
                    .filter_map(Result::ok)
                    .collect()
            };
            let ttl_queues: HashSet<i64> = ttl_rows.iter().map(|(_, q)| *q).collect();
            let ttl_ids: Vec<i64> = ttl_rows.iter().map(|(r, _)| *r).collect();
            for chunk in ttl_ids.chunks(MAXIMUM_PARAMETERS) {
                delete_message_rowids(&conn, chunk);
            }

            let hide_rows: Vec<(i64, i64)> = {
                let mut stmt = conn
                    .prepare("SELECT rowid, queue_rowid FROM messages WHERE hide > 0 AND hide <= ?1")
                    .expect("prepare hide scan");
                stmt.query_map(params![now], |row| Ok((row.get(0)?, row.get(1)?)))
                    .expect("query hide scan")
                    .filter_map(Result::ok)
                    .collect()
            };
            let hide_queues: HashSet<i64> = hide_rows.iter().map(|(_, q)| *q).collect();
            let hide_ids: Vec<i64> = hide_rows.iter().map(|(r, _)| *r).collect();
            for chunk in hide_ids.chunks(MAXIMUM_PARAMETERS) {
                let ph = placeholders(chunk.len());
                conn.execute(
                    &format!("UPDATE messages SET hide = 0 WHERE rowid IN ({})", ph),
                    rusqlite::params_from_iter(chunk.iter()),
                )
                .expect("unhide messages");
            }

            for queue_rowid in ttl_queues {
                if let Ok(account_rowid) = conn.query_row(
                    "SELECT account_rowid FROM queues WHERE rowid = ?1",
                    params![queue_rowid],
                    |row| row.get(0),
                ) {
                    check_empty_queue(&conn, account_rowid, queue_rowid);
                }
            }

            let mut to_notify = Vec::new();
            for queue_rowid in hide_queues {
                let names: Option<(String, String)> = conn
                    .query_row(
                        "SELECT accounts.account, queues.queue FROM queues \
                         JOIN accounts ON queues.account_rowid = accounts.rowid \
                         WHERE queues.rowid = ?1",
                        params![queue_rowid],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()
                    .expect("resolve queue name");
                if let Some(names) = names {
                    to_notify.push(names);
                }
            }
            to_notify
        };

        for (account, queue) in to_notify {
            self.waiters.notify(&account, &queue);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::test_engine;

    fn filter() -> Filter {
        Filter::default()
    }

    #[tokio::test]
    async fn create_get_delete_round_trip() {
        let engine = test_engine();
        let created = engine
            .create_message("acct", "q", "m1", b"hello".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        assert!(created);

        let got = engine.get_message("acct", "q", "m1", MessageDetail::Body, 1000).await.unwrap();
        assert_eq!(got, MessageProjection::Body(b"hello".to_vec()));

        engine.delete_message("acct", "q", "m1", MessageDetail::None, 1000).await.unwrap();
        let err = engine.get_message("acct", "q", "m1", MessageDetail::Id, 1000).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = engine.get_queues("acct", &filter(), EntityDetail::Id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn overwrite_in_place_reports_replaced() {
        let engine = test_engine();
        engine
            .create_message("acct", "q", "m1", b"a".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        let replaced = engine
            .create_message("acct", "q", "m1", b"b".to_vec(), Attrs::default(), 1000)
            .await
            .unwrap();
        assert!(!replaced);
        let got = engine.get_message("acct", "q", "m1", MessageDetail::Body, 1000).await.unwrap();
        assert_eq!(got, MessageProjection::Body(b"b".to_vec()));
    }

    #[tokio::test]
    async fn bulk_delete_with_no_filters_wipes_account() {
        let engine = test_engine();
        for q in ["q1", "q2"] {
            engine
                .create_message("acct", q, "m1", Vec::new(), Attrs::default(), 1000)
                .await
                .unwrap();
        }
        let deleted = engine.delete_accounts(&filter(), EntityDetail::Id).await.unwrap();
        assert_eq!(deleted, vec![EntityProjection::Id("acct".to_string())]);

        let err = engine.delete_accounts(&filter(), EntityDetail::None).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn ttl_reap_cascades_removal() {
        let engine = test_engine();
        let mut attrs = Attrs::default();
        attrs.ttl = Some(10);
        engine
            .create_message("acct", "q", "m1", Vec::new(), attrs, 1000)
            .await
            .unwrap();

        engine.clean(1005).await;
        let err = engine.get_accounts(&filter(), EntityDetail::Id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_marker_degrades_to_head() {
        let engine = test_engine();
        for id in ["m1", "m2"] {
            engine
                .create_message("acct", "q", id, Vec::new(), Attrs::default(), 1000)
                .await
                .unwrap();
        }
        let mut f = filter();
        f.marker = Some("does-not-exist".to_string());
        let mut seen = Vec::new();
        engine
            .scan_messages("acct", "q", &f, ScanMode::Get, None, MessageDetail::Id, 1000, &mut |p| {
                if let MessageProjection::Id(id) = p {
                    seen.push(id);
                }
            })
            .await
            .unwrap();
        assert_eq!(seen, vec!["m1".to_string(), "m2".to_string()]);
    }
}
