use uuid::Uuid;

/// Media rows that have no embeddings yet (anti-join on the embeddings table).
#[must_use]
pub fn find_unembedded_media(media_table: &str, embedding_table: &str) -> String {
    format!(
        "SELECT TO_JSON_STRING(m) FROM `{media_table}` m \
         WHERE id NOT IN (SELECT media_id FROM `{embedding_table}`)"
    )
}

#[must_use]
pub fn find_media_by_id(media_table: &str, id: &Uuid) -> String {
    format!("SELECT TO_JSON_STRING(m) FROM `{media_table}` m WHERE id = '{id}'")
}

/// A single scene, unnested out of the media row's `scenes` array.
#[must_use]
pub fn find_scene(media_table: &str, id: &Uuid, sequence: i32) -> String {
    format!(
        "SELECT TO_JSON_STRING(s) FROM `{media_table}`, UNNEST(scenes) s \
         WHERE id = '{id}' AND s.sequence = {sequence}"
    )
}

/// k-NN over the embeddings column: euclidean distance, nearest first.
#[must_use]
pub fn scene_knn(embedding_table: &str, embedding: &[f64], top_k: usize) -> String {
    let vector = embedding
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "SELECT TO_JSON_STRING(STRUCT(base.media_id AS media_id, \
         base.sequence_number AS sequence_number)) \
         FROM VECTOR_SEARCH(TABLE `{embedding_table}`, 'embeddings', \
         (SELECT [{vector}] as embed), top_k => {top_k}, \
         distance_type => 'EUCLIDEAN') ORDER BY distance asc"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_join_targets_both_tables() {
        let sql = find_unembedded_media("p.ds.media", "p.ds.scene_embeddings");
        assert!(sql.contains("FROM `p.ds.media` m"));
        assert!(sql.contains("id NOT IN (SELECT media_id FROM `p.ds.scene_embeddings`)"));
    }

    #[test]
    fn id_lookups_only_accept_uuids() {
        let id = Uuid::parse_str("14cd9c58-925a-57e1-84af-030affa05724").unwrap();
        let sql = find_media_by_id("p.ds.media", &id);
        assert!(sql.ends_with("WHERE id = '14cd9c58-925a-57e1-84af-030affa05724'"));

        let sql = find_scene("p.ds.media", &id, 3);
        assert!(sql.contains("UNNEST(scenes) s"));
        assert!(sql.contains("s.sequence = 3"));
    }

    #[test]
    fn knn_query_orders_by_ascending_distance() {
        let sql = scene_knn("p.ds.scene_embeddings", &[0.25, -1.5, 3.0], 5);
        assert!(sql.contains("VECTOR_SEARCH(TABLE `p.ds.scene_embeddings`, 'embeddings'"));
        assert!(sql.contains("(SELECT [0.25,-1.5,3] as embed)"));
        assert!(sql.contains("top_k => 5"));
        assert!(sql.contains("distance_type => 'EUCLIDEAN'"));
        assert!(sql.ends_with("ORDER BY distance asc"));
    }
}
