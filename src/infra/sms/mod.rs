pub mod twilio_sms_service;
