// ==========================================
// 集成测试 Mock 实现
// ==========================================

#![allow(dead_code)]

pub mod mock_config;
pub mod mock_registry;
