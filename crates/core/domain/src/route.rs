/// 频道名 → 电表 ID 的静态路由表。
///
/// 表内频道即桥接端订阅的全部频道；路由是纯函数，表外输入一律返回 None，
/// 对应报文在进入扇出之前被丢弃。
#[derive(Debug, Clone)]
pub struct ChannelTable {
    entries: Vec<(String, u32)>,
}

impl ChannelTable {
    /// 按 (频道名, 电表 ID) 列表构造路由表。
    pub fn new(entries: Vec<(String, u32)>) -> Self {
        Self { entries }
    }

    /// 路由一个频道名。已配置的频道返回其电表 ID，其余返回 None。
    pub fn route(&self, channel: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, meter_id)| *meter_id)
    }

    /// 按配置顺序遍历全部频道名（用于启动时订阅）。
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ChannelTable {
    /// 参考部署的固定频道集：pzem1..pzem3。
    fn default() -> Self {
        Self::new(vec![
            ("pzem1/all".to_string(), 1),
            ("pzem2/all".to_string(), 2),
            ("pzem3/all".to_string(), 3),
        ])
    }
}
