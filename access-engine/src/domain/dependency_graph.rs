// access-engine/src/domain/dependency_graph.rs

use crate::domain::ids::PermissionId;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// 権限依存の有向辺
///
/// `permission_id` が `depends_on_id` を必要とする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyEdge {
    pub permission_id: PermissionId,
    pub depends_on_id: PermissionId,
}

/// 依存グラフ単体で検出できる不整合
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GraphIssue {
    /// 循環依存(閉路を成す権限IDの列、先頭と末尾は同一)
    CircularDependency { cycle: Vec<PermissionId> },
    /// カタログに存在しない権限を参照するエッジ
    OrphanedEdge { edge: DependencyEdge },
}

impl std::fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphIssue::CircularDependency { cycle } => {
                let chain = cycle
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                write!(f, "circular dependency: {}", chain)
            }
            GraphIssue::OrphanedEdge { edge } => write!(
                f,
                "orphaned edge: {} -> {}",
                edge.permission_id, edge.depends_on_id
            ),
        }
    }
}

/// 権限依存グラフ
///
/// カタログ上の権限をノード、「必要とする」関係を有向辺とするDAG。
/// 操作ごとに永続層から一括ロードした隣接マップ上で探索するため、
/// 1クエリ1ホップの再帰参照は発生しない。
///
/// 生のエッジ行は隣接マップとは別に保持する。片側の端点が欠けた
/// エッジ(孤児エッジ)は探索からは除外しつつ、整合性検証と掃除の
/// 対象として残す。
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashSet<PermissionId>,
    requires: HashMap<PermissionId, HashSet<PermissionId>>,
    required_by: HashMap<PermissionId, HashSet<PermissionId>>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// ノード集合と既存エッジからグラフを構築
    ///
    /// ロード時は検証しない。閉路を含む既存データもそのまま保持し、
    /// 検出は `validate_integrity` が担う。
    pub fn from_parts(
        nodes: impl IntoIterator<Item = PermissionId>,
        edges: impl IntoIterator<Item = DependencyEdge>,
    ) -> Self {
        let mut graph = Self {
            nodes: nodes.into_iter().collect(),
            ..Self::default()
        };
        for edge in edges {
            graph.attach(edge);
        }
        graph
    }

    fn attach(&mut self, edge: DependencyEdge) {
        if self.nodes.contains(&edge.permission_id) && self.nodes.contains(&edge.depends_on_id) {
            self.requires
                .entry(edge.permission_id)
                .or_default()
                .insert(edge.depends_on_id);
            self.required_by
                .entry(edge.depends_on_id)
                .or_default()
                .insert(edge.permission_id);
        }
        self.edges.push(edge);
    }

    pub fn contains(&self, permission: PermissionId) -> bool {
        self.nodes.contains(&permission)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge(&self, from: PermissionId, to: PermissionId) -> bool {
        self.edges
            .iter()
            .any(|e| e.permission_id == from && e.depends_on_id == to)
    }

    /// `from -> to` のエッジ追加が閉路を生むか
    ///
    /// 自己ループ、または既存エッジを辿って `to` から `from` に到達できる
    /// 場合に真。探索は訪問済み集合で抑えるため、不正な既存データ上でも
    /// 停止する。
    pub fn would_create_cycle(&self, from: PermissionId, to: PermissionId) -> bool {
        if from == to {
            return true;
        }
        self.reaches(to, from)
    }

    fn reaches(&self, start: PermissionId, target: PermissionId) -> bool {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if let Some(next) = self.requires.get(&current) {
                for &dep in next {
                    if visited.insert(dep) {
                        queue.push_back(dep);
                    }
                }
            }
        }
        false
    }

    /// 依存エッジを追加する
    ///
    /// 閉路を生む追加は `CircularDependency`。既存エッジの再追加は
    /// 何もせず成功扱い(`Ok(false)`)。
    pub fn add_dependency(&mut self, from: PermissionId, to: PermissionId) -> AppResult<bool> {
        if self.would_create_cycle(from, to) {
            return Err(AppError::CircularDependency(format!(
                "adding edge {} -> {} would create a cycle",
                from, to
            )));
        }
        if self.has_edge(from, to) {
            return Ok(false);
        }
        self.attach(DependencyEdge {
            permission_id: from,
            depends_on_id: to,
        });
        Ok(true)
    }

    /// 依存エッジを削除する(存在しないエッジの削除は何もしない)
    pub fn remove_dependency(&mut self, from: PermissionId, to: PermissionId) -> bool {
        let before = self.edges.len();
        self.edges
            .retain(|e| !(e.permission_id == from && e.depends_on_id == to));
        if self.edges.len() == before {
            return false;
        }

        if let Some(deps) = self.requires.get_mut(&from) {
            deps.remove(&to);
        }
        if let Some(dependents) = self.required_by.get_mut(&to) {
            dependents.remove(&from);
        }
        true
    }

    /// 直接依存(1ホップ)
    pub fn direct_dependencies(&self, permission: PermissionId) -> HashSet<PermissionId> {
        self.requires.get(&permission).cloned().unwrap_or_default()
    }

    /// 直接被依存(1ホップ)
    pub fn direct_dependents(&self, permission: PermissionId) -> HashSet<PermissionId> {
        self.required_by
            .get(&permission)
            .cloned()
            .unwrap_or_default()
    }

    /// 推移的な依存の全体(自分自身は含まない、重複なし)
    pub fn all_dependencies(&self, permission: PermissionId) -> HashSet<PermissionId> {
        self.closure(permission, &self.requires)
    }

    /// 推移的な被依存の全体(逆向きの閉包)
    pub fn all_dependents(&self, permission: PermissionId) -> HashSet<PermissionId> {
        self.closure(permission, &self.required_by)
    }

    fn closure(
        &self,
        start: PermissionId,
        adjacency: &HashMap<PermissionId, HashSet<PermissionId>>,
    ) -> HashSet<PermissionId> {
        let mut result = HashSet::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if let Some(next) = adjacency.get(&current) {
                for &node in next {
                    if visited.insert(node) {
                        result.insert(node);
                        queue.push_back(node);
                    }
                }
            }
        }
        result
    }

    /// `from` から `to` へ至る依存エッジの最短経路(両端を含む)
    ///
    /// 到達不能、またはどちらかのノードが未登録なら空列。
    pub fn find_path(&self, from: PermissionId, to: PermissionId) -> Vec<PermissionId> {
        if !self.nodes.contains(&from) || !self.nodes.contains(&to) {
            return Vec::new();
        }
        if from == to {
            return vec![from];
        }

        let mut predecessor: HashMap<PermissionId, PermissionId> = HashMap::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for dep in self.sorted_neighbors(current) {
                if !visited.insert(dep) {
                    continue;
                }
                predecessor.insert(dep, current);
                if dep == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&prev) = predecessor.get(&cursor) {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(dep);
            }
        }
        Vec::new()
    }

    fn sorted_neighbors(&self, permission: PermissionId) -> Vec<PermissionId> {
        let mut neighbors: Vec<PermissionId> = self
            .requires
            .get(&permission)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        neighbors.sort();
        neighbors
    }

    /// グラフ全体の整合性検証(状態は変更しない)
    ///
    /// 直近の変更箇所に限らず、全ての閉路と孤児エッジを報告する。
    pub fn validate_integrity(&self) -> Vec<GraphIssue> {
        let mut issues: Vec<GraphIssue> = self
            .invalid_edges()
            .into_iter()
            .map(|edge| GraphIssue::OrphanedEdge { edge })
            .collect();

        for cycle in self.find_cycles() {
            issues.push(GraphIssue::CircularDependency { cycle });
        }
        issues
    }

    /// 端点が欠けたエッジの一覧
    pub fn invalid_edges(&self) -> Vec<DependencyEdge> {
        self.edges
            .iter()
            .filter(|e| {
                !self.nodes.contains(&e.permission_id) || !self.nodes.contains(&e.depends_on_id)
            })
            .copied()
            .collect()
    }

    /// 孤児エッジを取り除き、削除数を返す
    ///
    /// 閉路の一部であっても端点が揃っているエッジには触れない。
    pub fn cleanup_invalid_edges(&mut self) -> usize {
        let orphans: HashSet<DependencyEdge> = self.invalid_edges().into_iter().collect();
        if orphans.is_empty() {
            return 0;
        }
        self.edges.retain(|e| !orphans.contains(e));
        orphans.len()
    }

    /// 全ての閉路を列挙する(三色マーキングの反復DFS)
    ///
    /// 後退辺ごとに1つの閉路を報告する。閉路列は先頭ノードで閉じる。
    fn find_cycles(&self) -> Vec<Vec<PermissionId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<PermissionId, Color> =
            self.nodes.iter().map(|&n| (n, Color::White)).collect();
        let mut roots: Vec<PermissionId> = self.nodes.iter().copied().collect();
        roots.sort();

        let mut cycles = Vec::new();

        for root in roots {
            if color.get(&root) != Some(&Color::White) {
                continue;
            }

            let mut stack: Vec<(PermissionId, Vec<PermissionId>, usize)> = Vec::new();
            let mut path: Vec<PermissionId> = Vec::new();

            color.insert(root, Color::Gray);
            path.push(root);
            stack.push((root, self.sorted_neighbors(root), 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if frame.2 < frame.1.len() {
                    let next = frame.1[frame.2];
                    frame.2 += 1;

                    match color.get(&next).copied().unwrap_or(Color::Black) {
                        Color::White => {
                            color.insert(next, Color::Gray);
                            path.push(next);
                            stack.push((next, self.sorted_neighbors(next), 0));
                        }
                        Color::Gray => {
                            // 後退辺: path 上の出現位置から現在ノードまでが閉路
                            if let Some(pos) = path.iter().position(|&p| p == next) {
                                let mut cycle = path[pos..].to_vec();
                                cycle.push(next);
                                cycles.push(cycle);
                            }
                        }
                        Color::Black => {}
                    }
                } else {
                    color.insert(node, Color::Black);
                    stack.pop();
                    path.pop();
                }
            }
        }
        cycles
    }
}
