use crate::config::evaluation_config::GroupPolicy;
use crate::domain::model::Participant;
use crate::utils::error::ValidationFailure;

/// 評分者正在組成的小組。保留選取順序，提交時評分也依此順序排列
#[derive(Debug, Clone)]
pub struct GroupSelection {
    evaluator: Participant,
    policy: GroupPolicy,
    members: Vec<Participant>,
}

impl GroupSelection {
    /// 建立 `evaluator` 的空白選取
    pub fn new(evaluator: Participant, policy: GroupPolicy) -> Self {
        Self {
            evaluator,
            policy,
            members: Vec::new(),
        }
    }

    /// 加入成員，已在小組內時回傳 `Ok(false)`
    pub fn add(&mut self, participant: &Participant) -> Result<bool, ValidationFailure> {
        if self.contains(&participant.id) {
            return Ok(false);
        }

        if self.members.len() >= self.policy.max_group_size {
            return Err(ValidationFailure::GroupFull {
                max: self.policy.max_group_size,
            });
        }

        self.members.push(participant.clone());
        Ok(true)
    }

    /// 移除成員。小組人數不超過下限時不能移除評分者本人，其他成員則可隨時移除
    pub fn remove(&mut self, participant_id: &str) -> Result<bool, ValidationFailure> {
        if participant_id == self.evaluator.id && self.members.len() <= self.policy.min_group_size {
            return Err(ValidationFailure::SelfRemovalBlocked);
        }

        let before = self.members.len();
        self.members.retain(|member| member.id != participant_id);
        Ok(self.members.len() != before)
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.members.iter().any(|member| member.id == participant_id)
    }

    pub fn includes_evaluator(&self) -> bool {
        self.contains(&self.evaluator.id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    pub fn evaluator(&self) -> &Participant {
        &self.evaluator
    }

    pub fn policy(&self) -> &GroupPolicy {
        &self.policy
    }

    /// 檢查是否符合提交條件
    pub fn check_ready(&self) -> Result<(), ValidationFailure> {
        let size = self.members.len();
        if size < self.policy.min_group_size || size > self.policy.max_group_size {
            return Err(ValidationFailure::GroupSizeOutOfBounds {
                size,
                min: self.policy.min_group_size,
                max: self.policy.max_group_size,
            });
        }
        if !self.includes_evaluator() {
            return Err(ValidationFailure::EvaluatorNotSelected);
        }
        Ok(())
    }

    pub fn is_submit_ready(&self) -> bool {
        self.check_ready().is_ok()
    }

    /// 顯示用的 `已選/上限`
    pub fn progress_label(&self) -> String {
        format!("{}/{}", self.members.len(), self.policy.max_group_size)
    }
}
