use crate::models::Gift;

pub const DEFAULT_COMMENTS: &[&str] = &[
    "主播好美啊",
    "来了来了",
    "这个滤镜好自然",
    "今天讲什么书呀",
    "声音好好听",
    "点赞点赞",
    "主播是哪里人？",
    "第一次来，关注了",
    "背景音乐叫什么名字",
    "哈哈哈哈哈",
    "主播晚上好",
    "太治愈了",
    "求推荐书单",
    "一直在看，加油",
    "666",
    "好温柔的声音",
];

pub const GIFT_CATALOG: &[Gift] = &[
    Gift { name: "小心心", icon: "💗", value: 1 },
    Gift { name: "玫瑰", icon: "🌹", value: 1 },
    Gift { name: "棒棒糖", icon: "🍭", value: 9 },
    Gift { name: "墨镜", icon: "🕶️", value: 99 },
    Gift { name: "跑车", icon: "🏎️", value: 1200 },
    Gift { name: "火箭", icon: "🚀", value: 5000 },
    Gift { name: "嘉年华", icon: "🎡", value: 30000 },
];

pub fn default_comment_pool() -> Vec<String> {
    DEFAULT_COMMENTS.iter().map(|c| c.to_string()).collect()
}
